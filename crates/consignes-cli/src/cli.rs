//! Command-line definition.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use consignes_core::FormKey;
use consignes_core::dates::parse_date;

use crate::error::Result;

/// Daily habit and deliberate-practice tracking
#[derive(Parser, Debug)]
#[command(name = "consignes", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show and fill forms
    Form {
        #[command(subcommand)]
        action: FormAction,
    },
    /// Manage consignes
    Consigne {
        #[command(subcommand)]
        action: ConsigneAction,
    },
    /// Run the caching proxy
    Serve {
        /// Address to listen on (overrides proxy.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Inspect and edit the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Which form to work on.
#[derive(Args, Debug, Clone)]
pub struct FormTarget {
    /// Day: YYYY-MM-DD, today, yesterday, tomorrow or an offset like -2
    #[arg(short, long, default_value = "today")]
    pub date: String,

    /// Practice session on this category instead of the daily form
    #[arg(short, long, value_name = "CATEGORY")]
    pub practice: Option<String>,
}

impl FormTarget {
    /// Resolves the target against `today`.
    pub fn key(&self, today: NaiveDate) -> Result<FormKey> {
        let date = parse_date(&self.date, today)?;
        Ok(match &self.practice {
            Some(category) => FormKey::practice(date, category.trim()),
            None => FormKey::daily(date),
        })
    }
}

/// `consignes form ...`
#[derive(Subcommand, Debug)]
pub enum FormAction {
    /// Print a form with its current answers
    Show {
        #[command(flatten)]
        target: FormTarget,
    },
    /// Answer a form interactively, saving as you go
    Fill {
        #[command(flatten)]
        target: FormTarget,
        /// Submit once every question has been seen
        #[arg(long)]
        submit: bool,
    },
    /// Answer questions from the command line
    Answer {
        #[command(flatten)]
        target: FormTarget,
        /// Submit after saving
        #[arg(long)]
        submit: bool,
        /// Answers; an empty value clears the answer
        #[arg(required = true, value_name = "ID=VALUE")]
        answers: Vec<String>,
    },
    /// Progress of the daily form over a week
    Week {
        /// Any day of the week
        #[arg(short, long, default_value = "today")]
        date: String,
    },
}

/// `consignes consigne ...`
#[derive(Subcommand, Debug)]
pub enum ConsigneAction {
    /// List consignes
    List {
        /// Only this category
        #[arg(long)]
        category: Option<String>,
        /// Only consignes asked in the daily form of this day
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
        /// Include inactive consignes
        #[arg(long)]
        all: bool,
    },
    /// Create a consigne
    Add(AddArgs),
    /// Change fields of a consigne
    Edit(EditArgs),
    /// Delete a consigne
    Rm {
        /// Consigne id
        id: String,
    },
    /// List the categories in use
    Categories,
}

/// Fields of a new consigne.
#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Question text
    #[arg(long)]
    pub label: String,
    /// Category
    #[arg(long)]
    pub category: String,
    /// likert, yes_no, number, short_text, long_text or choice
    #[arg(long, default_value = "yes_no")]
    pub kind: String,
    /// Options of a choice question
    #[arg(long, value_delimiter = ',')]
    pub options: Vec<String>,
    /// daily, practice or weekdays:mon,wed,fri
    #[arg(long, default_value = "daily")]
    pub frequency: String,
    /// Explanation shown under the question
    #[arg(long)]
    pub help: Option<String>,
    /// 1 (high) to 3 (low)
    #[arg(long, default_value_t = 2)]
    pub priority: u8,
}

/// Fields to change on an existing consigne.
#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Consigne id
    pub id: String,
    /// Question text
    #[arg(long)]
    pub label: Option<String>,
    /// Category
    #[arg(long)]
    pub category: Option<String>,
    /// likert, yes_no, number, short_text, long_text or choice
    #[arg(long)]
    pub kind: Option<String>,
    /// Options of a choice question
    #[arg(long, value_delimiter = ',')]
    pub options: Vec<String>,
    /// daily, practice or weekdays:mon,wed,fri
    #[arg(long)]
    pub frequency: Option<String>,
    /// Explanation shown under the question (empty to remove)
    #[arg(long)]
    pub help: Option<String>,
    /// 1 (high) to 3 (low)
    #[arg(long)]
    pub priority: Option<u8>,
    /// Ask (true) or stop asking (false)
    #[arg(long)]
    pub active: Option<bool>,
}

/// `consignes config ...`
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the config file path
    Path,
    /// Print a value by dotted key (e.g. backend.url)
    Get {
        /// Dotted key
        key: String,
    },
    /// Set a value by dotted key
    Set {
        /// Dotted key
        key: String,
        /// New value
        value: String,
    },
    /// Write a default config file
    Init {
        /// Where to write it (defaults to the resolved path)
        #[arg(long)]
        file: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
