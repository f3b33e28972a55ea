mod backend;
mod ui;

use backend::controller::ImageRequest;
use backend::placeholder::{ImageFetchError, fetch_album_photos, fetch_photo_image};
use image::DynamicImage;
use ui::ui::{App, ui};

use crossterm::{
    event::{Event, EventStream, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{error::Error, io};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const ALBUM_ID: u32 = 1;

enum BackgroundTask {
    ImageLoaded {
        entry_id: u32,
        generation: u64,
        result: Result<DynamicImage, ImageFetchError>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();

    // Channel for background fetch results
    let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackgroundTask>();

    // Show loading screen while the catalog request runs
    app.set_loading("Fetching album photos...");
    terminal.draw(|f| ui(f, &mut app))?;

    match fetch_album_photos(ALBUM_ID).await {
        Ok(records) => {
            log::info!("loaded {} photo records for album {}", records.len(), ALBUM_ID);
            app.controller.populate(records);
            app.set_ready();
        }
        Err(err) => {
            log::error!("catalog load failed: {}", err);
            app.set_failed(err.to_string());
        }
    }

    let res = run_app(&mut terminal, &mut app, &mut task_rx, task_tx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("{err}");
    }
    Ok(())
}

fn spawn_image_loader(
    request: ImageRequest,
    tx: mpsc::UnboundedSender<BackgroundTask>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = fetch_photo_image(&request.url).await;
        let _ = tx.send(BackgroundTask::ImageLoaded {
            entry_id: request.entry_id,
            generation: request.generation,
            result,
        });
    })
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    task_rx: &mut mpsc::UnboundedReceiver<BackgroundTask>,
    task_tx: mpsc::UnboundedSender<BackgroundTask>,
) -> io::Result<()> {
    let mut event_stream = EventStream::new();

    // The one in-flight image fetch; aborted on delete and on quit
    let mut image_task: Option<JoinHandle<()>> = None;

    loop {
        terminal.draw(|f| ui(f, app))?;

        tokio::select! {
            // Periodic redraw for the loading indicators
            _ = tokio::time::sleep(tokio::time::Duration::from_millis(50)) => {}

            // Handle keyboard events
            Some(Ok(event)) = event_stream.next() => {
                if let Event::Key(key) = event {
                    if key.code == KeyCode::Char('q') {
                        abort_image_task(&mut image_task);
                        return Ok(());
                    }
                    handle_input(app, key.code, &mut image_task, &task_tx);
                }
            }

            // Handle background task results
            Some(task) = task_rx.recv() => {
                match task {
                    BackgroundTask::ImageLoaded { entry_id, generation, result } => {
                        app.on_image_result(entry_id, generation, result);
                        image_task = None;
                    }
                }
            }
        }
    }
}

fn handle_input(
    app: &mut App,
    key: KeyCode,
    image_task: &mut Option<JoinHandle<()>>,
    task_tx: &mpsc::UnboundedSender<BackgroundTask>,
) {
    match key {
        KeyCode::Up => {
            app.cursor_up();
        }
        KeyCode::Down => {
            app.cursor_down();
        }
        KeyCode::Enter => {
            if let Some(id) = app.entry_id_at_cursor() {
                if let Some(request) = app.controller.select(id) {
                    // select only hands out a request when nothing is in
                    // flight, so any stored handle is already finished
                    abort_image_task(image_task);
                    *image_task = Some(spawn_image_loader(request, task_tx.clone()));
                }
            }
        }
        KeyCode::Char('d') => {
            if let Some(id) = app.delete_selected() {
                abort_image_task(image_task);
                log::info!("deleted entry {}", id);
            }
        }
        _ => {}
    }
}

/// Safe to call with nothing in flight.
fn abort_image_task(image_task: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = image_task.take() {
        handle.abort();
    }
}
