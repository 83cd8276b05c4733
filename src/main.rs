use chromiumoxide::browser::{Browser, BrowserConfig};
use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::eyre};
use duo_headless::{
	browser::DuolingoTab,
	config::{AppConfig, SettingsFlags},
	runner, site,
	status::{StatusDisplay, TerminalStatus},
	store::AnswerStore,
};
use futures::StreamExt;
use v_utils::log;

#[derive(Debug, Parser)]
#[command(name = "duo_headless")]
#[command(about = "Replays remembered answers on Duolingo practice sessions", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,
	#[clap(flatten)]
	settings: SettingsFlags,
}

#[derive(Debug, Subcommand)]
enum Commands {
	/// Open the browser and practice until logged out (default)
	Run,
	/// Print the answers remembered for a question
	Lookup {
		/// Question text, exactly as shown on the page
		question: String,
	},
	/// Show how many answers are stored
	Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
	v_utils::clientside!();

	let cli = Cli::parse();
	let config = AppConfig::try_build(cli.settings).map_err(|e| eyre!("Failed to load config: {}", e))?;
	let store = AnswerStore::open(&config.answers_db_path())?;

	match cli.command.unwrap_or(Commands::Run) {
		Commands::Run => practice(&config, &store).await,
		Commands::Lookup { question } => {
			let answers = store.lookup(&question)?;
			if answers.is_empty() {
				println!("No answers stored for {:?}", question);
			}
			for (i, qa) in answers.iter().enumerate() {
				println!("{}. {}", i + 1, qa.answer);
			}
			Ok(())
		}
		Commands::Stats => {
			println!("{} answer(s) stored in {}", store.count()?, config.answers_db_path().display());
			Ok(())
		}
	}
}

async fn practice(config: &AppConfig, store: &AnswerStore) -> Result<()> {
	let mut status = TerminalStatus::new();
	status.set_status("Launching Browser...");

	let builder = BrowserConfig::builder().arg("--mute-audio");
	let builder = if config.headless { builder } else { builder.with_head() };
	let browser_config = builder.build().map_err(|e| eyre!("Failed to build browser config: {}", e))?;

	let (mut browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| eyre!("Failed to launch browser: {}", e))?;

	// Drain browser events so the connection doesn't stall
	let handle = tokio::spawn(async move { while let Some(_event) = handler.next().await {} });

	let page = browser.new_page("about:blank").await.map_err(|e| eyre!("Failed to create new page: {}", e))?;
	let tab = DuolingoTab::new(page);

	let result = async {
		site::open(&tab, &mut status, config).await?;
		site::accept_cookie_banner(&tab, &mut status).await?;
		site::login(&tab, &mut status, config).await?;
		site::accept_consent(&tab, &mut status, config).await?;
		runner::run(&tab, &mut status, store, config).await
	}
	.await;

	if let Err(e) = &result {
		runner::run_stop_hook(config, &format!("Stopped: {e}"));
	}

	log!("Closing browser...");
	drop(tab);
	browser.close().await.map_err(|e| eyre!("Failed to close browser: {}", e))?;
	handle.abort();

	result
}
