use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use league_odds::config::{Config, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(name = "league_odds")]
#[command(about = "Monte Carlo playoff odds for a round-robin league season", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Dataset JSON, overrides the configured path
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Team of interest (id, abbreviation or name fragment)
    #[arg(short, long)]
    team: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Season odds for every team
    Odds {
        /// Force an unplayed game, e.g. `2026-01-20-SOMB-TEAM4=home`
        #[arg(long = "force", value_name = "GAME=home|away")]
        forced: Vec<String>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        simulations: Option<i64>,
    },
    /// Finishing distribution of the team by number of remaining wins
    WinTable,
    /// Swing of each next-round game on the team's odds
    Matchday,
    /// Best and worst outcome combinations of the next round
    BestWorst {
        #[arg(long = "force", value_name = "GAME=home|away")]
        forced: Vec<String>,
    },
    /// Rebuild the odds cache
    Recompute,
    /// Rebuild the odds cache whenever the dataset changes
    Watch {
        /// Quiet period before a change is picked up
        #[arg(long, default_value = "300")]
        debounce_ms: u64,
        /// Polling interval
        #[arg(long, default_value = "2000")]
        interval_ms: u64,
    },
    /// Write the id/abbr/name map of the dataset
    TeamMap {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export cached odds to an xlsx workbook
    Export { path: PathBuf },
    /// Write a default config file
    Init,
}

fn main() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let load = || -> Result<commands::Context> {
        let mut config = Config::load(&cli.config)?;
        if let Some(data) = &cli.data {
            config.paths.dataset = data.clone();
        }
        commands::Context::new(config, cli.team.as_deref())
    };

    match cli.command {
        Commands::Odds {
            forced,
            seed,
            simulations,
        } => commands::odds(&load()?, &forced, seed, simulations),
        Commands::WinTable => commands::win_table(&load()?),
        Commands::Matchday => commands::matchday(&load()?),
        Commands::BestWorst { forced } => commands::best_worst(&load()?, &forced),
        Commands::Recompute => commands::recompute(&load()?).map(|_| ()),
        Commands::Watch {
            debounce_ms,
            interval_ms,
        } => commands::watch(load()?, debounce_ms, interval_ms),
        Commands::TeamMap { out } => commands::team_map(&load()?, out),
        Commands::Export { path } => commands::export(&load()?, &path),
        Commands::Init => commands::init(&cli.config),
    }
}

mod commands {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::thread;
    use std::time::{Duration, SystemTime};

    use anyhow::{Context as _, Result, anyhow, bail};
    use tracing::{info, warn};

    use league_odds::config::Config;
    use league_odds::dataset::{
        find_team_id, load_data, load_data_or_default, team_map as build_team_map,
    };
    use league_odds::export::export_workbook;
    use league_odds::format::{format_delta, format_pct, format_top_odds};
    use league_odds::odds_cache::{
        OddsCache, load_odds_cache, recompute_odds, save_legacy_odds, save_odds_cache,
    };
    use league_odds::{
        DataFile, ForcedOutcomes, GameResult, SimParams, TeamId, best_worst_next_round,
        build_matchday_impact, build_win_table, simulate_season,
    };

    pub struct Context {
        pub config: Config,
        pub data: DataFile,
        pub team_id: TeamId,
        team_arg: Option<String>,
    }

    impl Context {
        pub fn new(config: Config, team_arg: Option<&str>) -> Result<Self> {
            let data = load_data_or_default(&config.paths.dataset)?;
            let team_id = resolve_team(&config, &data, team_arg)?;
            Ok(Self {
                config,
                data,
                team_id,
                team_arg: team_arg.map(str::to_string),
            })
        }

        fn params(&self) -> SimParams {
            self.config.sim_params().with_team(self.team_id.clone())
        }

        fn team_name(&self) -> &str {
            self.data.team_name(&self.team_id)
        }

        /// Strict reload for the watcher: a half-written or invalid file keeps the previous
        /// dataset instead of falling back to the sample season.
        fn reload(&mut self) -> Result<()> {
            self.data = load_data(&self.config.paths.dataset)?;
            self.team_id = resolve_team(&self.config, &self.data, self.team_arg.as_deref())?;
            Ok(())
        }
    }

    fn resolve_team(config: &Config, data: &DataFile, team_arg: Option<&str>) -> Result<TeamId> {
        let found = match team_arg {
            Some(arg) => data
                .team(arg)
                .map(|t| t.id.clone())
                .or_else(|| find_team_id(data, arg, Some(arg))),
            None => config.team_of_interest(data),
        };
        found.ok_or_else(|| anyhow!("team of interest not found in dataset"))
    }

    fn parse_forced(raw: &[String]) -> Result<ForcedOutcomes> {
        let mut forced = ForcedOutcomes::new();
        for item in raw {
            let Some((game, result)) = item.split_once('=') else {
                bail!("expected GAME=home|away, got `{item}`");
            };
            let Some(result) = GameResult::parse(result) else {
                bail!("unknown outcome `{result}` for game {game}");
            };
            forced.insert(game.trim().to_string(), result);
        }
        Ok(forced)
    }

    pub fn init(config_path: &Path) -> Result<()> {
        if config_path.exists() {
            bail!("{} already exists", config_path.display());
        }
        Config::default().save(config_path)?;
        println!("Created default config at {}", config_path.display());
        Ok(())
    }

    pub fn odds(
        ctx: &Context,
        forced: &[String],
        seed: Option<u64>,
        simulations: Option<i64>,
    ) -> Result<()> {
        let mut params = ctx.params();
        params.forced_outcomes = parse_forced(forced)?;
        if let Some(seed) = seed {
            params.seed = Some(seed);
        }
        if let Some(simulations) = simulations {
            params.simulations = simulations;
        }
        let result = simulate_season(&ctx.data, &params)?;

        let mut teams: Vec<_> = ctx.data.teams.iter().collect();
        teams.sort_by(|a, b| result.odds(&b.id).total_cmp(&result.odds(&a.id)));

        println!(
            "Top-{} odds ({} simulations)",
            params.playoff_spots,
            params.trials()
        );
        for team in teams {
            let marker = if team.id == ctx.team_id { "*" } else { " " };
            println!(
                "{marker} {:<24} {:>3}-{:<3} {:>7}",
                team.name,
                team.wins,
                team.losses,
                format_top_odds(result.odds(&team.id), 1)
            );
        }
        Ok(())
    }

    pub fn win_table(ctx: &Context) -> Result<()> {
        let table = build_win_table(&ctx.data, &ctx.team_id, &ctx.params())?;
        println!(
            "{} ({} games left)",
            ctx.team_name(),
            table.remaining_games
        );
        for row in &table.rows {
            let top: f64 = row
                .rank_probs
                .iter()
                .take(ctx.config.simulation.playoff_spots)
                .sum();
            println!(
                "{:>2}-{:<2} -> {:>3}-{:<3} share {:>6}  top {:>6}  out {:>6}",
                row.remaining_wins,
                row.remaining_losses,
                row.wins,
                row.losses,
                format_pct(row.share),
                format_top_odds(top, 1),
                format_pct(row.no_playoffs)
            );
        }
        Ok(())
    }

    pub fn matchday(ctx: &Context) -> Result<()> {
        let Some(impact) = build_matchday_impact(&ctx.data, &ctx.team_id, &ctx.params())? else {
            println!("No games left to play");
            return Ok(());
        };
        println!("Round of {} for {}", impact.round_date, ctx.team_name());
        for row in &impact.games {
            println!(
                "{:<20} vs {:<20} home {:>6}  away {:>6}  root for {:<20} {}",
                ctx.data.team_name(&row.game.home),
                ctx.data.team_name(&row.game.away),
                format_top_odds(row.home_win_odds, 1),
                format_top_odds(row.away_win_odds, 1),
                ctx.data.team_name(row.better.winner(&row.game)),
                format_delta(row.delta)
            );
        }
        Ok(())
    }

    pub fn best_worst(ctx: &Context, forced: &[String]) -> Result<()> {
        let mut params = ctx.params();
        params.forced_outcomes = parse_forced(forced)?;
        let Some(result) = best_worst_next_round(&ctx.data, &ctx.team_id, &params)? else {
            println!("No games left to play");
            return Ok(());
        };
        println!(
            "Round of {}: {} scenarios for {}",
            result.round_date,
            result.scenarios,
            ctx.team_name()
        );
        println!(
            "Best  {:>6}  {}",
            format_top_odds(result.best.odds, 1),
            result.best.label
        );
        println!(
            "Worst {:>6}  {}",
            format_top_odds(result.worst.odds, 1),
            result.worst.label
        );
        Ok(())
    }

    pub fn recompute(ctx: &Context) -> Result<OddsCache> {
        let cache = recompute_odds(&ctx.data, &ctx.team_id, &ctx.params())?;
        save_odds_cache(&ctx.config.paths.odds_cache, &cache)?;
        if let Some(legacy) = &ctx.config.paths.legacy_odds {
            save_legacy_odds(legacy, &cache)?;
        }
        info!(
            path = %ctx.config.paths.odds_cache.display(),
            odds = cache.result.odds(&ctx.team_id),
            "odds cache written"
        );
        Ok(cache)
    }

    fn modified(path: &Path) -> Option<SystemTime> {
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    pub fn watch(mut ctx: Context, debounce_ms: u64, interval_ms: u64) -> Result<()> {
        let path = ctx.config.paths.dataset.clone();
        let interval = Duration::from_millis(interval_ms.max(100));
        let debounce = Duration::from_millis(debounce_ms);

        recompute(&ctx)?;
        let mut last = modified(&path);
        info!(path = %path.display(), "watching dataset");
        loop {
            thread::sleep(interval);
            let current = modified(&path);
            if current == last {
                continue;
            }
            thread::sleep(debounce);
            if modified(&path) != current {
                continue;
            }
            last = current;
            if let Err(err) = ctx.reload().and_then(|_| recompute(&ctx).map(|_| ())) {
                warn!(error = %err, "recompute after dataset change failed");
            }
        }
    }

    pub fn team_map(ctx: &Context, out: Option<PathBuf>) -> Result<()> {
        let path = out.unwrap_or_else(|| ctx.config.paths.team_map.clone());
        let entries = build_team_map(&ctx.data);
        let json = serde_json::to_string_pretty(&entries).context("serialize team map")?;
        fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        println!("Wrote {} teams to {}", entries.len(), path.display());
        Ok(())
    }

    pub fn export(ctx: &Context, path: &Path) -> Result<()> {
        let params = ctx.params();
        let cache = match load_odds_cache(&ctx.config.paths.odds_cache) {
            Some(cache) if cache.is_valid_for(&ctx.data, &ctx.team_id, &params) => cache,
            _ => recompute(ctx)?,
        };
        let report = export_workbook(path, &ctx.data, &cache)?;
        println!(
            "Exported {} teams, {} win-table rows, {} matchday games to {}",
            report.teams,
            report.win_table_rows,
            report.matchday_games,
            path.display()
        );
        Ok(())
    }
}
