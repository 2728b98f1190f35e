// SPDX-License-Identifier: MIT OR Apache-2.0

mod config;
mod output;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use libtrolley::{
    ConnectionArgs, LinkTarget, MemoryBackend, MutationOutcome, RequestContext, Session,
    Verbosity,
};
use serde::Serialize;

use crate::config::CliConfig;
use crate::output::{JsonOutput, Listing, ansi, print_connection, print_rows};

mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const PARTIAL_FAILURE: i32 = 1;
    pub const FATAL_ERROR: i32 = 2;
}

#[derive(Parser)]
#[command(name = "trolley")]
#[command(about = "query and edit grocery shopping lists against a data snapshot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// snapshot file of the data service
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// user the request runs as
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// session token forwarded to the data service
    #[arg(long, global = true)]
    token: Option<String>,

    /// enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// output results as json
    #[arg(long, global = true)]
    json: bool,

    /// open configuration file in editor
    #[arg(long)]
    edit_config: bool,
}

#[derive(Args, Clone, Default)]
struct PageArgs {
    /// page forward, this many rows
    #[arg(long)]
    first: Option<usize>,

    /// cursor to page forward from
    #[arg(long)]
    after: Option<String>,

    /// page backward, this many rows
    #[arg(long)]
    last: Option<usize>,

    /// cursor to page backward from
    #[arg(long)]
    before: Option<String>,

    /// words the name must contain
    #[arg(long)]
    name: Option<String>,

    /// words the description must contain
    #[arg(long)]
    description: Option<String>,

    /// sort option, e.g. PriceAscending or NameDescending
    #[arg(long)]
    sort: Option<String>,
}

impl PageArgs {
    fn to_connection_args(&self) -> ConnectionArgs {
        ConnectionArgs {
            first: self.first,
            after: self.after.clone(),
            last: self.last,
            before: self.before.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            sort_option: self.sort.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// show the consolidated shopping list
    ShoppingList(PageArgs),
    /// list current specials
    Specials {
        #[command(flatten)]
        page: PageArgs,

        /// only specials carrying this tag id
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// only specials from this store id
        #[arg(long = "store")]
        stores: Vec<String>,

        /// only specials carrying the tag with this key
        #[arg(long = "tag-key")]
        tag_keys: Vec<String>,

        /// only specials from the store with this key
        #[arg(long = "store-key")]
        store_keys: Vec<String>,
    },
    /// list stores
    Stores(PageArgs),
    /// list tags shown to users
    Tags(PageArgs),
    /// list the user's staple shopping lists
    StapleLists(PageArgs),
    /// list the user's staple items
    StapleItems {
        #[command(flatten)]
        page: PageArgs,

        /// only items carrying the tag with this key
        #[arg(long = "tag-key")]
        tag_keys: Vec<String>,

        /// only popular items
        #[arg(long)]
        popular: bool,
    },
    /// add a special to the shopping list
    AddSpecial { special_id: String },
    /// add a staple shopping list to the shopping list
    AddStaple { staple_shopping_list_id: String },
    /// add a staple list by name, creating it when needed
    AddStapleByName { name: String },
    /// add several specials and staple lists at once
    AddItems {
        /// special ids to add
        #[arg(long = "special")]
        specials: Vec<String>,

        /// staple shopping list ids to add
        #[arg(long = "staple")]
        staples: Vec<String>,
    },
    /// remove a special from the shopping list
    RemoveSpecial {
        special_id: String,

        /// remove every entry instead of one
        #[arg(long)]
        all: bool,
    },
    /// remove a staple shopping list from the shopping list
    RemoveStaple {
        staple_shopping_list_id: String,

        /// remove every entry instead of one
        #[arg(long)]
        all: bool,
    },
    /// remove the entries behind the given shopping-list link ids
    RemoveItems {
        #[arg(required = true)]
        shopping_list_ids: Vec<String>,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.edit_config {
        if let Err(e) = CliConfig::edit_config() {
            output_error(&cli, &e.to_string());
            std::process::exit(exit_codes::FATAL_ERROR);
        }
        return;
    }

    let config = match CliConfig::load() {
        Ok(c) => c,
        Err(e) => {
            output_error(&cli, &format!("failed to load config: {e}"));
            std::process::exit(exit_codes::FATAL_ERROR);
        }
    };

    match run(&cli, &config) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output_error(&cli, &e.to_string());
            std::process::exit(exit_codes::FATAL_ERROR);
        }
    }
}

fn wants_json(cli: &Cli) -> bool {
    cli.json || !atty::is(atty::Stream::Stdout)
}

fn output_error(cli: &Cli, msg: &str) {
    if wants_json(cli) {
        let output: JsonOutput<()> = JsonOutput::err(msg);
        match serde_json::to_string(&output) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("error: {msg}"),
        }
    } else {
        eprintln!("{} {msg}", ansi::bold("error:"));
    }
}

fn run(cli: &Cli, config: &CliConfig) -> libtrolley::Result<i32> {
    let snapshot_path = cli
        .snapshot
        .clone()
        .or_else(|| config.snapshot.clone())
        .ok_or_else(|| {
            libtrolley::Error::config("no snapshot given; pass --snapshot or set it in trolley.toml")
        })?;
    let user_id = cli
        .user
        .clone()
        .or_else(|| config.user.clone())
        .ok_or_else(|| {
            libtrolley::Error::config("no user given; pass --user or set it in trolley.toml")
        })?;

    let verbosity = if cli.verbose {
        Verbosity::Verbose
    } else {
        config.verbosity
    };

    let backend = MemoryBackend::load(&snapshot_path)?;
    let mut session = Session::new(user_id.clone());
    if let Some(token) = cli.token.clone().or_else(|| config.token.clone()) {
        session = session.with_token(token);
    }
    let ctx = RequestContext::new(session, backend.services(), config.inner.clone());
    let user = user_id.as_str();

    let default_command = Commands::ShoppingList(PageArgs::default());
    match cli.command.as_ref().unwrap_or(&default_command) {
        Commands::ShoppingList(page) => {
            let connection = libtrolley::get_shopping_list(&ctx, user, &page.to_connection_args())?;
            show(cli, &connection, verbosity)
        }
        Commands::Specials {
            page,
            tags,
            stores,
            tag_keys,
            store_keys,
        } => {
            let mut args = page.to_connection_args();
            args.tags = (!tags.is_empty()).then(|| tags.clone());
            args.stores = (!stores.is_empty()).then(|| stores.clone());
            args.tag_keys = (!tag_keys.is_empty()).then(|| tag_keys.clone());
            args.store_keys = (!store_keys.is_empty()).then(|| store_keys.clone());
            show(cli, &libtrolley::get_specials(&ctx, &args)?, verbosity)
        }
        Commands::Stores(page) => show(
            cli,
            &libtrolley::get_stores(&ctx, &page.to_connection_args())?,
            verbosity,
        ),
        Commands::Tags(page) => show(
            cli,
            &libtrolley::get_tags(&ctx, &page.to_connection_args())?,
            verbosity,
        ),
        Commands::StapleLists(page) => show(
            cli,
            &libtrolley::get_staple_shopping_list(&ctx, user, &page.to_connection_args())?,
            verbosity,
        ),
        Commands::StapleItems {
            page,
            tag_keys,
            popular,
        } => {
            let mut args = page.to_connection_args();
            args.tag_keys = (!tag_keys.is_empty()).then(|| tag_keys.clone());
            args.popular = popular.then_some(true);
            show(cli, &libtrolley::get_staple_item(&ctx, user, &args)?, verbosity)
        }
        Commands::AddSpecial { special_id } => {
            let outcome = libtrolley::add_special_item_to_user_shopping_list(&ctx, user, special_id);
            settle(cli, &backend, &snapshot_path, outcome, verbosity)
        }
        Commands::AddStaple {
            staple_shopping_list_id,
        } => {
            let outcome = libtrolley::add_staple_shopping_list_item_to_user_shopping_list(
                &ctx,
                user,
                staple_shopping_list_id,
            );
            settle(cli, &backend, &snapshot_path, outcome, verbosity)
        }
        Commands::AddStapleByName { name } => {
            let outcome =
                libtrolley::add_new_staple_shopping_list_to_shopping_list(&ctx, user, name);
            settle(cli, &backend, &snapshot_path, outcome, verbosity)
        }
        Commands::AddItems { specials, staples } => {
            let targets: Vec<LinkTarget> = specials
                .iter()
                .map(LinkTarget::price)
                .chain(staples.iter().map(LinkTarget::staple_shopping_list))
                .collect();
            let outcome = libtrolley::add_items_to_shopping_list(&ctx, user, &targets);
            settle_rows(cli, &backend, &snapshot_path, outcome, verbosity)
        }
        Commands::RemoveSpecial { special_id, all } => {
            if *all {
                let outcome =
                    libtrolley::remove_special_items_from_user_shopping_list(&ctx, user, special_id);
                settle_all(cli, &backend, &snapshot_path, outcome, verbosity)
            } else {
                let outcome =
                    libtrolley::remove_special_item_from_user_shopping_list(&ctx, user, special_id);
                settle(cli, &backend, &snapshot_path, outcome, verbosity)
            }
        }
        Commands::RemoveStaple {
            staple_shopping_list_id,
            all,
        } => {
            if *all {
                let outcome = libtrolley::remove_staple_shopping_list_items_from_user_shopping_list(
                    &ctx,
                    user,
                    staple_shopping_list_id,
                );
                settle_all(cli, &backend, &snapshot_path, outcome, verbosity)
            } else {
                let outcome = libtrolley::remove_staple_shopping_list_item_from_user_shopping_list(
                    &ctx,
                    user,
                    staple_shopping_list_id,
                );
                settle(cli, &backend, &snapshot_path, outcome, verbosity)
            }
        }
        Commands::RemoveItems { shopping_list_ids } => {
            let outcome =
                libtrolley::remove_items_from_shopping_list(&ctx, user, shopping_list_ids);
            settle_rows(cli, &backend, &snapshot_path, outcome, verbosity)
        }
    }
}

fn show<T: Listing + Serialize>(
    cli: &Cli,
    connection: &libtrolley::Connection<T>,
    verbosity: Verbosity,
) -> libtrolley::Result<i32> {
    if wants_json(cli) {
        let output = JsonOutput::ok(connection);
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_connection(connection, verbosity);
    }
    Ok(exit_codes::SUCCESS)
}

/// persists a successful mutation; a soft failure leaves the snapshot untouched.
fn persist<T>(
    cli: &Cli,
    backend: &MemoryBackend,
    path: &Path,
    outcome: &MutationOutcome<T>,
) -> libtrolley::Result<Option<i32>> {
    if let Some(message) = &outcome.error_message {
        if wants_json(cli) {
            let output: JsonOutput<()> = JsonOutput::err(message.as_str());
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            eprintln!("{} {message}", ansi::bold("error:"));
        }
        return Ok(Some(exit_codes::PARTIAL_FAILURE));
    }

    backend.save(path)?;
    log::debug!("**cli:** saved snapshot to {}", path.display());
    Ok(None)
}

fn settle<T: Listing + Serialize>(
    cli: &Cli,
    backend: &MemoryBackend,
    path: &Path,
    outcome: MutationOutcome<T>,
    verbosity: Verbosity,
) -> libtrolley::Result<i32> {
    if let Some(code) = persist(cli, backend, path, &outcome)? {
        return Ok(code);
    }

    if wants_json(cli) {
        println!("{}", serde_json::to_string_pretty(&JsonOutput::ok(&outcome))?);
    } else if verbosity != Verbosity::Quiet {
        match &outcome.item {
            Some(item) => println!(
                "{} {}  {}",
                ansi::bold("done:"),
                item.title(),
                item.detail(verbosity)
            ),
            None => println!("{} shopping list updated", ansi::bold("done:")),
        }
    }
    Ok(exit_codes::SUCCESS)
}

fn settle_all(
    cli: &Cli,
    backend: &MemoryBackend,
    path: &Path,
    outcome: MutationOutcome<()>,
    verbosity: Verbosity,
) -> libtrolley::Result<i32> {
    if let Some(code) = persist(cli, backend, path, &outcome)? {
        return Ok(code);
    }

    if wants_json(cli) {
        println!("{}", serde_json::to_string_pretty(&JsonOutput::ok(&outcome))?);
    } else if verbosity != Verbosity::Quiet {
        println!("{} shopping list updated", ansi::bold("done:"));
    }
    Ok(exit_codes::SUCCESS)
}

fn settle_rows(
    cli: &Cli,
    backend: &MemoryBackend,
    path: &Path,
    outcome: MutationOutcome<Vec<libtrolley::ConsolidatedRow>>,
    verbosity: Verbosity,
) -> libtrolley::Result<i32> {
    if let Some(code) = persist(cli, backend, path, &outcome)? {
        return Ok(code);
    }

    if wants_json(cli) {
        println!("{}", serde_json::to_string_pretty(&JsonOutput::ok(&outcome))?);
    } else if let Some(rows) = &outcome.item {
        print_rows(rows, verbosity);
    }
    Ok(exit_codes::SUCCESS)
}
