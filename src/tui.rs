//! Terminal output helpers: the banner and the `warning!`, `detail!` and
//! `output!` status macros. Accessible mode drops colours and symbols.
use colorful::{Color, Colorful};

/// Prints a red `[!]` line. Accessible mode prints the bare message.
#[macro_export]
macro_rules! warning {
    ($name:expr) => {
        eprintln!("{} {}", ansi_term::Colour::Red.bold().paint("[!]"), $name);
    };
    ($name:expr, $accessible:expr) => {
        if $accessible {
            eprintln!("{}", $name);
        } else {
            eprintln!("{} {}", ansi_term::Colour::Red.bold().paint("[!]"), $name);
        }
    };
}

/// Prints a blue `[~]` line.
#[macro_export]
macro_rules! detail {
    ($name:expr) => {
        eprintln!("{} {}", ansi_term::Colour::Blue.bold().paint("[~]"), $name);
    };
    ($name:expr, $accessible:expr) => {
        if $accessible {
            eprintln!("{}", $name);
        } else {
            eprintln!("{} {}", ansi_term::Colour::Blue.bold().paint("[~]"), $name);
        }
    };
}

/// Prints a green `[>]` line.
#[macro_export]
macro_rules! output {
    ($name:expr) => {
        eprintln!("{} {}", ansi_term::Colour::RGB(0, 255, 9).bold().paint("[>]"), $name);
    };
    ($name:expr, $accessible:expr) => {
        if $accessible {
            eprintln!("{}", $name);
        } else {
            eprintln!(
                "{} {}",
                ansi_term::Colour::RGB(0, 255, 9).bold().paint("[>]"),
                $name
            );
        }
    };
}

const BANNER: &str = r"
 ___  ___  _ __   __ _ _ __ _____ __ __ _  ___ ___
/ __|/ _ \| '_ \ / _` | '__|_   _| '__/ _` |/ __/ _ \
\__ \ (_) | | | | (_| | |    | | | | | (_| | (_|  __/
|___/\___/|_| |_|\__,_|_|    |_| |_|  \__,_|\___\___|";

pub const AUTHORIZATION_NOTICE: &str =
    "Only scan systems you own or are explicitly authorized to test.";

/// Prints the banner to stderr so that a report sent to stdout stays clean.
pub fn print_banner(accessible: bool) {
    if accessible {
        eprintln!("SonarTrace {}", env!("CARGO_PKG_VERSION"));
        return;
    }
    eprintln!("{}", BANNER.gradient(Color::Green).bold());
    eprintln!(
        "{}",
        format!(
            "SonarTrace {}: Nmap wrapper for authorized host enumeration",
            env!("CARGO_PKG_VERSION")
        )
        .gradient(Color::LightCyan)
    );
}
