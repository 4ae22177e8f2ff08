use crate::models::Style;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes content.";

/// User message sent to the hosted chat API.
pub fn hosted_prompt(style: Style, input: &str) -> String {
    let instruction = match style {
        Style::Tldr => "Summarize the following text in short and brief TL;DR:",
        Style::Bullet => "Summarize the following text into few bullet points:",
        Style::Eli5 => "Explain this like I'm 5 in few simple sentences:",
    };
    format!("{}\n\n{}", instruction, input)
}

/// Single-shot prompt sent to the local daemon.
pub fn local_prompt(style: Style, input: &str) -> String {
    let instruction = match style {
        Style::Tldr => "Summarize the following text in a short and brief TL;DR:",
        Style::Bullet => "Summarize the following text into a few bullet points:",
        Style::Eli5 => "Explain this like I'm 5 in a few simple sentences:",
    };
    format!("{}\n\n{}", instruction, input)
}
