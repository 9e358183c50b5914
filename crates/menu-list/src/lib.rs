//! Menu list: binds menu rows (a name and an image url) to recyclable row views and resolves each
//! row's image through the background image loader.

mod data;
mod menu_adapter;
mod row_view;

pub use data::{parse_menu, MenuError, MenuRow};
pub use menu_adapter::{AdapterError, AdapterStats, MenuAdapter};
pub use row_view::{ImageSlot, LabelSlot, ParentId, RowView, RowViewId, RowViewState};

pub use image_loader::{Bitmap, ImageLoader, LoaderConfig};
