#![cfg(not(tarpaulin_include))]

use std::env;
use std::path::Path;
use tracker::aggregator::aggregate;
use tracker::config::TrackerConfig;
use tracker::datekey::resolve_date_key;
use tracker::history::collect_history;
use tracker::matcher::IdentityMatcher;
use tracker::report::{to_csv, unmatched_buckets, user_summaries};
use tracker::store::{Workbook, from_csv_dir, load_snapshot, save_csv_dir, save_snapshot};
use tracker::timelabel::extract_time_label;

const USAGE: &str = "Usage:
  cli match <name> <name>
  cli date <raw>
  cli time <raw>
  cli <workbook> stats|unmatched|export
  cli <workbook> history <name> <intern id>
  cli <workbook> groups
  cli <workbook> sync-emails

<workbook> is a directory of CSV sheets or a .bin.gz snapshot.
Set TRACKER_CONFIG to use a JSON config instead of the defaults.";

fn open_workbook(path: &str) -> Result<Workbook, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    if p.is_dir() {
        Ok(from_csv_dir(p)?)
    } else {
        Ok(load_snapshot(p)?)
    }
}

fn save_workbook(workbook: &Workbook, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let p = Path::new(path);
    if p.is_dir() {
        save_csv_dir(workbook, p)?;
    } else {
        save_snapshot(workbook, p)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    let config_path = env::var("TRACKER_CONFIG").ok();
    let config = TrackerConfig::load_or_default(config_path.as_deref().map(Path::new))?;
    let matcher = IdentityMatcher::new(config.thresholds);

    // Commands that need no workbook
    match args[1].as_str() {
        "match" => {
            if args.len() == 4 {
                println!("{}", matcher.are_equivalent(&args[2], &args[3]));
            } else {
                eprintln!("{}", USAGE);
            }
            return Ok(());
        }
        "date" => {
            match resolve_date_key(&args[2..].join(" ")) {
                Some(day) => println!("{}", day),
                None => println!("(unresolvable)"),
            }
            return Ok(());
        }
        "time" => {
            println!("{}", extract_time_label(&args[2..].join(" ")));
            return Ok(());
        }
        _ => {}
    }

    let mut workbook = open_workbook(&args[1])?;
    let roster = workbook.roster(&config.roster);
    let sources = workbook.all_source_rows(&config)?;

    match args[2].as_str() {
        "stats" => {
            let stats = aggregate(&sources, &roster, &matcher);
            let photos = workbook.profile_photos(&config.profile_sheet);
            for s in user_summaries(&roster, &stats, &photos) {
                println!("{:<32} {:>4}  {}", s.name, s.days_completed, s.last_log_date);
            }
        }
        "unmatched" => {
            let stats = aggregate(&sources, &roster, &matcher);
            for b in unmatched_buckets(&roster, &stats) {
                println!("{:<32} {:>4}  {}", b.raw_name, b.days_completed, b.last_log_date);
            }
        }
        "export" => {
            let stats = aggregate(&sources, &roster, &matcher);
            let photos = workbook.profile_photos(&config.profile_sheet);
            print!("{}", to_csv(&user_summaries(&roster, &stats, &photos)));
        }
        "history" if args.len() == 5 => {
            let Some(target) = roster.authorize(
                &matcher,
                &args[3],
                &args[4],
                config.admin_credential.as_deref(),
            ) else {
                eprintln!("Error: invalid name or intern id");
                return Ok(());
            };
            for r in collect_history(&sources, &roster, &matcher, target) {
                println!(
                    "{}  {:>8}  {:<12} {:<10} {}",
                    r.day_key, r.time_label, r.source_tag, r.category, r.summary
                );
            }
        }
        "groups" => {
            for g in workbook.monitor_groups(&config.groups_sheet) {
                println!("{}: {}", g.monitor, g.members.join(", "));
            }
        }
        "sync-emails" => {
            let updated = workbook.sync_roster_emails(&config.roster, &config.sources, &matcher)?;
            if updated > 0 {
                save_workbook(&workbook, &args[1])?;
            }
            println!("Synced {} emails", updated);
        }
        _ => eprintln!("{}", USAGE),
    }

    Ok(())
}
