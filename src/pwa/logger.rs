use std::sync::LazyLock;

use crate::logger::Logger;
use crate::pwa::constants::PWA_LOGGER_NAME;

pub static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new(PWA_LOGGER_NAME));
