use crate::agent::{ChatReply, ToolTraceEntry};
use crate::tools::adapters::notification::{Alert, Severity};
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

pub fn print_alert(alert: &Alert) {
    let line = format!("[{}] {}", severity_label(alert.severity), alert.message);
    match alert.severity {
        Severity::Critical => println!("{}", line.white().on_red().bold()),
        Severity::Warning => println!("{}", line.yellow().bold()),
        Severity::Info => println!("{}", line.cyan()),
    }
}

pub fn print_trace(trace: &[ToolTraceEntry]) {
    for entry in trace {
        let status = match entry.error {
            None => "ok".green(),
            Some(kind) => kind.as_str().red(),
        };
        println!(
            "  {} #{} {}({}) {} in {}ms, {} attempt(s)",
            "->".dimmed(),
            entry.round,
            entry.tool.bold(),
            entry.arguments,
            status,
            entry.duration_ms,
            entry.attempts
        );
    }
}

pub fn print_reply(reply: &ChatReply) {
    match reply.outcome.failure() {
        None => println!("{}", reply.answer),
        Some(reason) => {
            println!("{}", reply.answer.yellow());
            print_info(&format!("(request ended early: {})", reason));
        }
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "INFO",
        Severity::Warning => "WARNING",
        Severity::Critical => "CRITICAL",
    }
}
