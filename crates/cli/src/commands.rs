use crate::cli::{Commands, ConfigCommands, FamilyArgs, FavoriteCommands, SessionArgs, StatsArgs};
use crate::context::AppContext;
use crate::watch;
use anyhow::{bail, Context, Result};
use scorebook_core::activity::{daily_summaries, day_activity_curve, monthly_summaries, session_list};
use scorebook_core::modifiers::FamilyMember;
use scorebook_core::stats::{detailed_stats, profile_stats};
use scorebook_core::{analyze_session, latest_session_id, scenario_family, session_runs, Run};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

pub fn dispatch(command: Commands, mut ctx: AppContext) -> Result<()> {
    match command {
        Commands::Scan => scan(&ctx),
        Commands::Sessions { limit } => sessions(&ctx, limit),
        Commands::Session(args) => session(&ctx, &args),
        Commands::Family(args) => family(&ctx, &args),
        Commands::Stats(args) => stats(&ctx, &args),
        Commands::Profile => print_json(&profile_stats(&ctx.load_history()?)),
        Commands::Calendar { monthly } => {
            let history = ctx.load_history()?;
            if monthly {
                print_json(&monthly_summaries(&history))
            } else {
                print_json(&daily_summaries(&history))
            }
        }
        Commands::Day { date } => {
            let history = ctx.load_history()?;
            let runs: Vec<Run> = history
                .into_iter()
                .filter(|r| r.timestamp.date() == date)
                .collect();
            print_json(&json!({
                "date": date,
                "runs": runs.len(),
                "curve": day_activity_curve(&runs).to_vec(),
            }))
        }
        Commands::Favorite { action } => favorite(&mut ctx, action),
        Commands::Config { action } => config(&mut ctx, action),
        Commands::Watch => watch::run(&ctx),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{out}");
    Ok(())
}

fn scan(ctx: &AppContext) -> Result<()> {
    let history = ctx.load_history()?;
    let latest = latest_session_id(&history);
    info!(runs = history.len(), "Scan complete");
    print_json(&json!({
        "runs": history.len(),
        "sessions": latest.map_or(0, |id| id + 1),
        "latestSession": latest,
        "cacheDir": ctx.cache.dir(),
    }))
}

fn sessions(ctx: &AppContext, limit: Option<usize>) -> Result<()> {
    let mut list = session_list(&ctx.load_history()?);
    if let Some(limit) = limit {
        list.truncate(limit);
    }
    print_json(&list)
}

fn session(ctx: &AppContext, args: &SessionArgs) -> Result<()> {
    let history = ctx.load_history()?;
    let Some(id) = args.id.or_else(|| latest_session_id(&history)) else {
        bail!("no sessions recorded yet");
    };
    let runs = session_runs(&history, id);

    // A per-scenario flow window applies only when the session is one scenario
    let only_scenario = runs
        .first()
        .map(|r| r.scenario.as_str())
        .filter(|name| runs.iter().all(|r| r.scenario == *name));
    let flow_window = args
        .flow_window
        .unwrap_or_else(|| ctx.settings.flow_window(only_scenario));
    let stack_pbs = args.stack_pbs.unwrap_or_else(|| ctx.settings.stack_pbs());

    match analyze_session(&runs, &history, flow_window, stack_pbs) {
        Some(summary) => print_json(&summary),
        None => bail!("session {id} has no runs"),
    }
}

fn family(ctx: &AppContext, args: &FamilyArgs) -> Result<()> {
    let history = ctx.load_history()?;
    let family = scenario_family(&history, &args.base);
    if family.is_empty() {
        bail!("no runs for scenarios starting with {:?}", args.base);
    }
    match &args.axis {
        Some(axis) => {
            let members: Vec<&FamilyMember> = family.along_axis(axis, None);
            print_json(&json!({
                "base": family.base,
                "axis": axis,
                "kinds": family.kinds_for_axis(axis),
                "members": members,
            }))
        }
        None => print_json(&json!({
            "base": family.base,
            "axes": family.axes(),
            "members": family.members,
        })),
    }
}

fn stats(ctx: &AppContext, args: &StatsArgs) -> Result<()> {
    let history = ctx.load_history()?;
    let runs: Vec<Run> = history
        .into_iter()
        .filter(|r| r.scenario == args.scenario)
        .filter(|r| args.sens.map_or(true, |s| r.sens == s))
        .collect();
    match detailed_stats(&runs) {
        Some(stats) => print_json(&stats),
        None => bail!("no runs for {:?}", args.scenario),
    }
}

fn favorite(ctx: &mut AppContext, action: FavoriteCommands) -> Result<()> {
    match action {
        FavoriteCommands::Add { scenario } => ctx.settings.add_favorite(&scenario)?,
        FavoriteCommands::Remove { scenario } => ctx.settings.remove_favorite(&scenario)?,
        FavoriteCommands::List => {}
    }
    print_json(&ctx.settings.favorites())
}

fn config(ctx: &mut AppContext, action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Show => {}
        ConfigCommands::Set { key, value, scenario } => {
            let value: Value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            match scenario {
                Some(name) => ctx.settings.set_scenario(&name, &key, value)?,
                None => ctx.settings.set_global(&key, value)?,
            }
            info!(key = %key, path = %ctx.settings.path().display(), "Setting saved");
        }
    }
    print_json(&json!({
        "path": ctx.settings.path(),
        "statsPath": ctx.settings.stats_path(),
        "sessionGap": ctx.settings.session_gap_minutes(),
        "flowWindow": ctx.settings.flow_window(None),
        "stackPbs": ctx.settings.stack_pbs(),
        "fallbackDurationSecs": ctx.settings.fallback_duration_secs(),
        "favorites": ctx.settings.favorites(),
    }))
}
