mod card;
mod clock;
mod deck;
mod extract;
mod frontmatter;
mod path;
mod play;
mod search;
mod session;
mod shuffle;
mod snapshot;
mod storage;
mod study;
mod summary;

pub use card::{
    FlashcardItem, FlashcardMode, FlashcardScope, FlashcardTopicDeck, FlashcardsRetakeMode,
    FlashcardsSessionSummary,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use deck::{build_course_deck, build_topic_deck, card_ids, select_localized_topic_files, LocalizedTopic};
pub use extract::{extract_flashcards, extract_flashcards_from_source, FlashcardSourceFile};
pub use path::{
    course_from_path, is_same_or_descendant_topic, normalize_flashcard_path, parse_flashcard_data_path,
    FlashcardDataPath,
};
pub use play::{localized_href, FlashcardsOptions, FlashcardsPlay, FlashcardsSelection, EXPLORER_ROUTE, PLAY_ROUTE};
pub use search::{
    append_flashcards_retake_mode, build_flashcards_last_report_storage_key, build_flashcards_search,
    build_flashcards_session_storage_key, compare_titles, normalize_explorer_search_state,
    parse_flashcards_retake_mode, parse_flashcards_search, FlashcardsNamedOption, FlashcardsSearchState,
    SearchParams,
};
pub use session::{
    interpret_swipe, CardTransition, SessionEffect, SessionEngine, SessionEvent, SessionKey, SwipeOutcome,
    TouchPoint, EXIT_X, MOUNT_LOCK_MS, POST_TRANSITION_LOCK_MS, RESTART_LOCK_MS, SWIPE_MAX, SWIPE_THRESHOLD,
    TRANSITION_MS,
};
pub use shuffle::{
    advance_shuffle_seed, derive_shuffle_seed, hash_ids, shuffle, FixedSeed, Mulberry32, SeedSource, TimeSeed,
};
pub use snapshot::{
    get_active_courses, get_flashcard_course_snapshot, get_flashcards_explorer_data, ExplorerCourse,
    ExplorerTopic, FlashcardCatalog, FlashcardCourseSnapshot, FlashcardsExplorerData, ALL_COURSES_SLUG,
};
pub use storage::{
    load_flashcards_last_report_summary, load_flashcards_session_summary, store_flashcards_last_report_summary,
    store_flashcards_session_summary, FileStore, KeyValueStore, MemoryStore, StorageError,
};
pub use study::{FlashcardsStudy, SummaryOrigin};
pub use summary::{
    append_flashcards_session_summary, filter_flashcards_session_summary, normalize_flashcards_session_summary,
    parse_flashcards_session_summary, sanitize_flashcard_ids,
};
