//! Auto Containers CLI
//!
//! Sort, validate and query container rule files outside the browser.

mod source;

use std::fs;

use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use ac_core::{Pattern, TldList};
use ac_rules::{parse_rules, sort_key, sort_rules_with_stats, validate_all, SortKey};
use source::RulesSource;

#[derive(Parser)]
#[command(name = "ac-cli")]
#[command(about = "Auto Containers rule sorter and inspector")]
struct Cli {
    /// Exported extension settings to read rules from
    #[arg(long, global = true)]
    settings: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sort rules into priority order
    Sort {
        /// Rules file
        #[arg(short, long)]
        input: Option<String>,

        /// Write sorted rules here instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Fail if the rules are not already sorted
        #[arg(long)]
        check: bool,
    },

    /// Check every rule line
    Validate {
        /// Rules file
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Show the first rule matching a URL
    Match {
        /// Rules file
        #[arg(short, long)]
        input: Option<String>,

        /// URL to route
        #[arg(short, long)]
        url: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the group key of every rule
    #[command(alias = "explain")]
    Keys {
        /// Rules file
        #[arg(short, long)]
        input: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);

    let settings = cli.settings;
    let result = match cli.command {
        Commands::Sort { input, output, check } => {
            cmd_sort(&RulesSource::new(input, settings), output.as_deref(), check)
        }
        Commands::Validate { input } => cmd_validate(&RulesSource::new(input, settings)),
        Commands::Match { input, url, json } => {
            cmd_match(&RulesSource::new(input, settings), &url, json)
        }
        Commands::Keys { input } => cmd_keys(&RulesSource::new(input, settings)),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_sort(source: &RulesSource, output: Option<&str>, check: bool) -> Result<(), String> {
    let text = source.load()?;
    let (sorted, stats) = sort_rules_with_stats(&text, &TldList::default());

    if check {
        if sorted.trim_end() != text.trim_end() {
            return Err(format!("{} rule(s) are not in priority order", stats.rules));
        }
        println!("{} rule(s) already sorted", stats.rules);
        return Ok(());
    }

    match output {
        Some(path) => {
            fs::write(path, format!("{sorted}\n"))
                .map_err(|e| format!("Failed to write '{}': {}", path, e))?;
            println!("Sorted {} rule(s) into '{}'", stats.rules, path);
            println!("  Groups:   {}", stats.groups);
            println!("  Dropped:  {}", stats.rejected);
            if stats.unsettled_groups > 0 {
                println!("  Unsettled groups: {}", stats.unsettled_groups);
            }
        }
        None => println!("{sorted}"),
    }
    Ok(())
}

fn cmd_validate(source: &RulesSource) -> Result<(), String> {
    let text = source.load()?;
    let errors = validate_all(&text);
    if errors.is_empty() {
        println!("{} rule(s) OK", parse_rules(&text).rules.len());
        return Ok(());
    }
    for error in &errors {
        println!("{error}");
    }
    Err(format!("{} invalid line(s)", errors.len()))
}

fn cmd_match(source: &RulesSource, url: &str, json: bool) -> Result<(), String> {
    let text = source.load()?;
    let parsed = parse_rules(&text);
    let hit = parsed.rules.iter().find(|line| {
        Pattern::parse(&line.rule.pattern)
            .map(|p| p.matches_str(url))
            .unwrap_or(false)
    });

    if json {
        let value = match hit {
            Some(line) => serde_json::json!({
                "url": url,
                "pattern": line.rule.pattern,
                "container": line.rule.container,
                "line": line.line_number,
            }),
            None => serde_json::json!({ "url": url, "container": null }),
        };
        let out = serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?;
        println!("{out}");
        return Ok(());
    }

    match hit {
        Some(line) => println!(
            "{} -> {} (line {}: {})",
            url, line.rule.container, line.line_number, line.text
        ),
        None => println!("{} -> no rule, temporary container", url),
    }
    Ok(())
}

fn cmd_keys(source: &RulesSource) -> Result<(), String> {
    let text = source.load()?;
    let tlds = TldList::default();
    for line in parse_rules(&text).rules {
        println!(
            "{:>4}  {:<24}  {}",
            line.line_number,
            describe_key(&sort_key(&line.rule.pattern, &tlds)),
            line.text
        );
    }
    Ok(())
}

fn describe_key(key: &SortKey) -> String {
    match key {
        SortKey::Domain(label) => format!("domain:{label}"),
        SortKey::GlobalTld(label) => format!("tld:{label}"),
        SortKey::CatchAll => "catch-all".to_string(),
    }
}
