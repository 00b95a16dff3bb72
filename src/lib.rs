pub mod config;
pub mod content;
pub mod flashcards;
pub mod i18n;
