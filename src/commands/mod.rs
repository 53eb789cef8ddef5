mod history;
mod trip;

pub use history::*;
pub use trip::*;
