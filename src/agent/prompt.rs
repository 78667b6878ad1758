//! Instructions registered with the hosted agent.

use chrono::NaiveDate;

use crate::tools::ToolRegistry;

/// Build the agent instructions with tool descriptions and today's date.
pub fn build_instructions(today: NaiveDate, tools: &ToolRegistry) -> String {
    let tool_descriptions = tools
        .list_tools()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a helpful flight search assistant. Your goal is to help users find flights by:
1. Understanding their travel requirements from natural language
2. Extracting departure and arrival cities/airports
3. Determining travel dates
4. Using the flight search tool to search for available flights
5. Presenting the results in a clear, organized way
6. Always making sure the dates are in the future. The current date is {today}.

When users provide vague locations, ask for clarification about specific airports.
When dates are unclear, ask for specific dates.
Always confirm the search details before executing the search.

## Tools

{tool_descriptions}"#,
        today = today.format("%Y-%m-%d"),
        tool_descriptions = tool_descriptions
    )
}
