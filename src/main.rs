use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use manga_card_reader::browser::BrowserManager;
use manga_card_reader::config::Config;
use manga_card_reader::discovery::LinkDiscovery;
use manga_card_reader::pacing::{Pause, TokioPause};
use manga_card_reader::page::PageOpener;
use manga_card_reader::progression::ChapterProgressionController;
use manga_card_reader::queue::{atomic_write, ProgressStore};
use manga_card_reader::rewards::RewardMonitor;
use manga_card_reader::run_log::RunLog;
use manga_card_reader::scroll::ScrollCompletionDetector;
use std::sync::Arc;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} - {t} - {l} - {m}{n}";

fn init_logging() {
    let Err(e) = log4rs::init_file("log4rs.yml", Default::default()) else {
        return;
    };

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let fallback = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));

    match fallback {
        Ok(config) => {
            if log4rs::init_config(config).is_ok() {
                log::warn!("log4rs.yml not loaded ({}), logging to console only", e);
            }
        }
        Err(err) => eprintln!("Logging disabled: {}", err),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::load();
    let run = RunLog::new();
    let log = run.scoped("reader");
    log.info(format_args!("Starting run, queue at {}", config.queue.path.display()));

    // Take the queue lock before launching Chrome so a second instance exits early
    let store = ProgressStore::open(
        &config.queue.path,
        config.queue.removal,
        run.scoped("reader::queue"),
    )?;

    let browser_config = config
        .browser
        .browser_config()
        .with_profile_file(&config.browser.profile_file)?;
    let manager = tokio::task::spawn_blocking(move || BrowserManager::new(browser_config)).await??;
    let opener: Arc<dyn PageOpener> = Arc::new(manager);
    let pause: Arc<dyn Pause> = Arc::new(TokioPause);

    if config.discovery.enabled {
        let discovery = LinkDiscovery::new(
            Arc::clone(&opener),
            config.discovery.clone(),
            config.pacing.settle,
            Arc::clone(&pause),
            run.scoped("reader::discovery"),
        );
        let titles = discovery.discover().await?;
        let mut catalog = titles.join("\n");
        catalog.push('\n');
        atomic_write(&config.discovery.output, catalog.as_bytes())?;
        log.info(format_args!(
            "Wrote {} titles to {}",
            titles.len(),
            config.discovery.output.display()
        ));
    }

    let notifications = opener.open(&config.site.notifications_url, false).await?;
    let monitor = RewardMonitor::new(
        notifications,
        config.site.reward_marker.clone(),
        config.pacing.notifications_settle,
        Arc::clone(&pause),
        run.scoped("reader::rewards"),
    );
    let detector = ScrollCompletionDetector::new(
        config.scroll.policy(),
        Arc::clone(&pause),
        run.scoped("reader::scroll"),
    );

    let controller = ChapterProgressionController::new(
        opener,
        store,
        monitor,
        detector,
        pause,
        config.progression_settings(),
        run.scoped("reader::progression"),
    );

    let summary = controller.run_and_close().await?;
    log.info(format_args!(
        "Run finished: {} titles, {} completed, {} chapters read, {} cards, {} cooldowns",
        summary.titles.len(),
        summary.finished(),
        summary.chapters_read(),
        summary.rewards(),
        summary.cooldowns()
    ));

    Ok(())
}
