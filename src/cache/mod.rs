pub mod outline_snapshot;

pub use outline_snapshot::{
    clear_outline_snapshot, load_outline_snapshot, load_saved_at, save_outline_snapshot,
    OutlineSnapshot,
};
