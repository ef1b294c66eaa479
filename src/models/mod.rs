pub mod click;
pub mod link;

pub use click::{ClickEvent, NewClick};
pub use link::ShortLink;
