use std::io::{self, BufRead, Write};

use crossterm::style::Stylize;

pub trait Notifier {
    fn show_error(&self, title: &str, message: &str);
    fn show_warning(&self, title: &str, message: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier {
    wait_for_ack: bool,
}

impl ConsoleNotifier {
    pub fn new(wait_for_ack: bool) -> Self {
        Self { wait_for_ack }
    }

    fn show(&self, label: String, title: &str, message: &str) {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{label} {}", title.bold());
        for line in message.lines() {
            let _ = writeln!(stderr, "  {line}");
        }
        if self.wait_for_ack {
            let _ = write!(stderr, "{}", "press enter to continue".dim());
            let _ = stderr.flush();
            let mut line = String::new();
            let _ = io::stdin().lock().read_line(&mut line);
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn show_error(&self, title: &str, message: &str) {
        self.show("error:".red().bold().to_string(), title, message);
    }

    fn show_warning(&self, title: &str, message: &str) {
        self.show("warning:".yellow().bold().to_string(), title, message);
    }
}
