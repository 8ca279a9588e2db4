//! Prompt templates for dashboard and chat generation

/// The literal marker the model must emit for undisclosed information
pub const NOT_DISCLOSED: &str = "Not disclosed.";

/// The eight mandatory dashboard section headings, in required order
pub const DASHBOARD_SECTIONS: [&str; 8] = [
    "## Company Overview",
    "## Business Model and GTM",
    "## Funding & Investor Profile",
    "## Growth Momentum",
    "## Visibility & Market Sentiment",
    "## Risks and Challenges",
    "## Outlook",
    "## Disclosure Gaps",
];

/// System prompt for dashboard generation
pub const DASHBOARD_SYSTEM_PROMPT: &str = "\
You generate an investor-facing diligence dashboard for a private AI startup.

Use ONLY data in the provided payload. If something is unknown or not disclosed, literally say \"Not disclosed.\"

If a claim is marketing, attribute it: \"The company states ...\"

Never include personal emails or phone numbers.

Always include the final section \"## Disclosure Gaps\".

Required section order:

## Company Overview
## Business Model and GTM
## Funding & Investor Profile
## Growth Momentum
## Visibility & Market Sentiment
## Risks and Challenges
## Outlook
## Disclosure Gaps";

/// System prompt for the chat interface
pub const CHAT_SYSTEM_PROMPT: &str = "\
You are an expert investment analyst assistant specializing in private AI and Fintech startups. You help users understand companies in the InvestIQ database by answering questions and providing insights.

Guidelines:
- Be conversational, helpful, and professional
- When discussing companies, base your answers on retrieved context when available
- If you don't have specific information, say so clearly
- Cite sources when referencing retrieved data";

/// User prompt for dashboard generation: company name, serialized context,
/// and the instruction to use only the supplied data
pub fn dashboard_user_prompt(company: &str, payload: &str) -> String {
    format!(
        "Generate an investment analysis report for {company}.\n\n\
         Use ONLY the data below. Use \"Not disclosed.\" for missing info.\n\n\
         {payload}\n\n\
         Generate all 8 sections.\n"
    )
}

/// Context-injection message for a chat turn with non-empty evidence
pub fn chat_context_message(rendered_context: &str) -> String {
    format!(
        "Relevant information retrieved for this conversation:\n\n{rendered_context}\n\n\
         Base your answer on this information where applicable and cite the sources."
    )
}

/// The fixed dashboard returned when no context exists for a company.
/// No model call is made for it.
pub fn empty_dashboard(company: &str) -> String {
    format!(
        "# {company} - Investment Analysis Report\n\n\
         ## Company Overview\nNot disclosed.\n\n\
         ## Business Model and GTM\nNot disclosed.\n\n\
         ## Funding & Investor Profile\nNot disclosed.\n\n\
         ## Growth Momentum\nNot disclosed.\n\n\
         ## Visibility & Market Sentiment\nNot disclosed.\n\n\
         ## Risks and Challenges\nNot disclosed.\n\n\
         ## Outlook\nNot disclosed.\n\n\
         ## Disclosure Gaps\n\
         - All company information\n\
         - No data available in vector database\n"
    )
}
