use image_loader::{ImageLoader, LoaderError};
use log::{error, info, LevelFilter};
use menu_list::{AdapterError, MenuAdapter, MenuError, ParentId, RowViewId};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

mod config;

use config::BedConfig;

const DEFAULT_MENU: &str = "data/menu.json";
const LIST_PARENT: ParentId = ParentId(1);

#[derive(Error, Debug)]
pub enum BedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] json5::Error),
    #[error("Menu error: {0}")]
    Menu(#[from] MenuError),
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),
}

fn drain(adapter: &mut MenuAdapter, timeout: Duration) {
    while adapter.has_pending() {
        if !adapter.wait_for_completion(timeout) {
            error!("Gave up waiting for images");
            break;
        }
    }
}

fn print_views(adapter: &MenuAdapter, views: &[RowViewId]) {
    for id in views {
        let Some(view) = adapter.view(*id) else {
            continue;
        };

        match view.image() {
            Some(image) => info!(
                "  view {:?} row {:?} '{}' -> {}x{}",
                id,
                view.position(),
                view.label(),
                image.width,
                image.height
            ),
            None => info!(
                "  view {:?} row {:?} '{}' -> placeholder",
                id,
                view.position(),
                view.label()
            ),
        }
    }
}

/// Binds the menu the way a list widget would: fill the visible rows with fresh views, then
/// scroll page by page reusing the same views, then scroll back to the top where everything
/// should come from the cache.
fn run(menu_path: PathBuf, config: BedConfig) -> Result<(), BedError> {
    let rows = menu_list::parse_menu(&std::fs::read_to_string(&menu_path)?)?;
    info!("Loaded {} menu rows from {}", rows.len(), menu_path.display());

    let loader_config = config.loader_config();
    let wait = loader_config.timeout + Duration::from_secs(1);
    let visible = config.visible_rows().min(rows.len());

    let loader = ImageLoader::new(loader_config)?;
    let mut adapter = MenuAdapter::new(rows, loader);
    let mut views: Vec<RowViewId> = Vec::with_capacity(visible);

    let mut first = 0;
    while first < adapter.row_count() {
        let last = (first + visible).min(adapter.row_count());

        for (slot, position) in (first..last).enumerate() {
            let reuse = views.get(slot).copied();
            let id = adapter.get_view(position, reuse, LIST_PARENT)?;
            if reuse.is_none() {
                views.push(id);
            }
        }

        drain(&mut adapter, wait);
        info!("Rows {}..{}:", first, last);
        print_views(&adapter, &views[..last - first]);

        first = last;
    }

    for (position, id) in views.iter().enumerate() {
        adapter.get_view(position, Some(*id), LIST_PARENT)?;
    }
    adapter.update();
    info!("Back at the top:");
    print_views(&adapter, &views);

    info!("Adapter: {:?}", adapter.stats());
    info!("Loader:  {:?}", adapter.loader().stats());

    Ok(())
}

fn main() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .try_init();

    let mut args = std::env::args().skip(1);
    let menu_path = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_MENU.to_string()));

    let config = match args.next() {
        Some(path) => match BedConfig::load(&PathBuf::from(path)) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        },
        None => BedConfig::default(),
    };

    if let Err(e) = run(menu_path, config) {
        error!("{}", e);
        std::process::exit(1);
    }
}
