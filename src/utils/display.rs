use crate::core::UnifiedMessage;
use crate::engine::ConversationSnapshot;
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
}

/// One line per message: `[id] role: content`
pub fn format_message(message: &UnifiedMessage) -> String {
    let role = message.role().unwrap_or("?");
    let content = match message.content() {
        Some(content) => content.to_string(),
        None => serde_json::to_string(&message.payload).unwrap_or_default(),
    };
    format!("[{}] {}: {}", message.id, role, content)
}

pub fn print_message(message: &UnifiedMessage) {
    let line = format_message(message);
    match message.role() {
        Some("user") => println!("{}", line.white()),
        Some("assistant") => println!("{}", line.bright_green()),
        Some("system") => println!("{}", line.dimmed()),
        _ => println!("{}", line),
    }
}

pub fn print_snapshot(snapshot: &ConversationSnapshot) {
    if snapshot.has_more_before {
        print_info("... older messages available (type 'more')");
    }
    for message in &snapshot.messages {
        print_message(message);
    }
    if let Some(error) = &snapshot.error {
        print_error(&error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        let message = UnifiedMessage::new("m1")
            .with_field("role", "user")
            .with_field("content", "Hello");
        assert_eq!(format_message(&message), "[m1] user: Hello");

        let bare = UnifiedMessage::new("m2").with_field("tokens", 3);
        assert_eq!(format_message(&bare), r#"[m2] ?: {"tokens":3}"#);
    }
}
