use crate::runtime::{Builder, Loop};

#[must_use]
pub(crate) fn init_loop(builder: Option<Builder>) -> Loop {
    builder.unwrap_or_default().build()
}
