use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    #[default]
    It,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unsupported locale {0:?}, expected one of: en, it")]
pub struct UnsupportedLocale(pub String);

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::It => "it",
        }
    }
}

impl FromStr for Locale {
    type Err = UnsupportedLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "it" => Ok(Locale::It),
            _ => Err(UnsupportedLocale(s.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const EN: &[(&str, &str)] = &[
    ("flashcards", "Flashcards"),
    ("flashcardsTopic", "Topic deck"),
    ("flashcardsCourse", "Course deck"),
    ("flashcardsScopeLabel", "Scope"),
    ("flashcardsScopeTopic", "Topic"),
    ("flashcardsScopeCourse", "Course"),
    ("flashcardsCourseLabel", "Course"),
    ("flashcardsTopicLabel", "Topic"),
    ("flashcardsTopicAll", "Entire course"),
    ("flashcardsModeLabel", "Method"),
    ("flashcardsModeStudy", "Study"),
    ("flashcardsModeInteractive", "Interactive"),
    ("flashcardsNoTopic", "No topic found"),
    ("flashcardsNoCards", "No flashcards found for this selection yet."),
    ("flashcardsQuestion", "Question"),
    ("flashcardsAnswer", "Answer"),
    ("flashcardsFlip", "Flip card"),
    ("flashcardsPass", "Discard"),
    ("flashcardsConfirm", "Confirm"),
    ("flashcardsRemaining", "Remaining"),
    ("flashcardsConfirmed", "Discarded"),
    ("flashcardsPassed", "Correct"),
    ("flashcardsPassedTag", "Correct"),
    ("flashcardsCompletedTitle", "Deck completed"),
    ("flashcardsRestart", "Restart deck"),
    ("flashcardsViewReport", "See report"),
    ("flashcardsResultsTitle", "Session results"),
    ("flashcardsResultsPassed", "Correct"),
    ("flashcardsResultsNotPassed", "Discarded"),
    ("flashcardsPassedHighlightHint", "Cards you confirmed are highlighted in study mode."),
    ("flashcardsRetakeAll", "Retake all cards"),
    ("flashcardsRetakePassedOnly", "Retake discarded cards"),
];

const IT: &[(&str, &str)] = &[
    ("flashcards", "Flashcards"),
    ("flashcardsTopic", "Mazzo argomento"),
    ("flashcardsCourse", "Mazzo corso"),
    ("flashcardsScopeLabel", "Ambito"),
    ("flashcardsScopeTopic", "Argomento"),
    ("flashcardsScopeCourse", "Corso"),
    ("flashcardsCourseLabel", "Corso"),
    ("flashcardsTopicLabel", "Argomento"),
    ("flashcardsTopicAll", "Intero corso"),
    ("flashcardsModeLabel", "Metodo"),
    ("flashcardsModeStudy", "Studio"),
    ("flashcardsModeInteractive", "Interattivo"),
    ("flashcardsNoTopic", "Nessun argomento trovato"),
    ("flashcardsNoCards", "Nessuna flashcard disponibile per questa selezione."),
    ("flashcardsQuestion", "Domanda"),
    ("flashcardsAnswer", "Risposta"),
    ("flashcardsFlip", "Gira card"),
    ("flashcardsPass", "Scarta"),
    ("flashcardsConfirm", "Conferma"),
    ("flashcardsRemaining", "Rimanenti"),
    ("flashcardsConfirmed", "Scartate"),
    ("flashcardsPassed", "Superate"),
    ("flashcardsPassedTag", "Superata"),
    ("flashcardsCompletedTitle", "Mazzo completato"),
    ("flashcardsRestart", "Ricomincia"),
    ("flashcardsViewReport", "Vedi resoconto"),
    ("flashcardsResultsTitle", "Risultati sessione"),
    ("flashcardsResultsPassed", "Superate"),
    ("flashcardsResultsNotPassed", "Scartate"),
    ("flashcardsPassedHighlightHint", "Le card confermate sono evidenziate in modalita studio."),
    ("flashcardsRetakeAll", "Riprova tutte le card"),
    ("flashcardsRetakePassedOnly", "Riprova solo le card scartate"),
];

/// Label lookup for one locale.
#[derive(Debug, Clone, Copy)]
pub struct Translations {
    locale: Locale,
    table: &'static [(&'static str, &'static str)],
}

impl Translations {
    /// `it` gets Italian labels, every other value English.
    pub fn for_locale(locale: &str) -> Self {
        match locale.parse() {
            Ok(Locale::It) => Self::new(Locale::It),
            _ => Self::new(Locale::En),
        }
    }

    pub fn new(locale: Locale) -> Self {
        let table = match locale {
            Locale::En => EN,
            Locale::It => IT,
        };
        Self { locale, table }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// The label for `key`, or `key` itself when there is none.
    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        self.table
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap_or(key)
    }
}

/// Every string the deck views print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardsDeckLabels {
    pub question: String,
    pub answer: String,
    pub flip: String,
    pub pass: String,
    pub confirm: String,
    pub remaining: String,
    pub confirmed: String,
    pub passed: String,
    pub passed_tag: String,
    pub completed_title: String,
    pub restart: String,
    pub view_report: String,
}

pub fn build_flashcards_deck_labels<'a>(t: impl Fn(&'a str) -> &'a str) -> FlashcardsDeckLabels {
    let label = |key: &'a str| t(key).to_string();
    FlashcardsDeckLabels {
        question: label("flashcardsQuestion"),
        answer: label("flashcardsAnswer"),
        flip: label("flashcardsFlip"),
        pass: label("flashcardsPass"),
        confirm: label("flashcardsConfirm"),
        remaining: label("flashcardsRemaining"),
        confirmed: label("flashcardsConfirmed"),
        passed: label("flashcardsPassed"),
        passed_tag: label("flashcardsPassedTag"),
        completed_title: label("flashcardsCompletedTitle"),
        restart: label("flashcardsRestart"),
        view_report: label("flashcardsViewReport"),
    }
}

impl Translations {
    pub fn deck_labels(&self) -> FlashcardsDeckLabels {
        build_flashcards_deck_labels(|key| self.t(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_locales() {
        assert_eq!(" EN ".parse::<Locale>(), Ok(Locale::En));
        assert_eq!("it".parse::<Locale>(), Ok(Locale::It));
        assert_eq!(Locale::default(), Locale::It);
        assert!("de".parse::<Locale>().is_err());
    }

    #[test]
    fn unknown_keys_echo() {
        let t = Translations::for_locale("it");
        assert_eq!(t.t("flashcardsAnswer"), "Risposta");
        assert_eq!(t.t("nope.missing"), "nope.missing");
        assert_eq!(Translations::for_locale("fr").t("flashcardsAnswer"), "Answer");
    }

    #[test]
    fn tables_share_keys() {
        let en: Vec<&str> = EN.iter().map(|(k, _)| *k).collect();
        let it: Vec<&str> = IT.iter().map(|(k, _)| *k).collect();
        assert_eq!(en, it);
    }

    #[test]
    fn builds_labels() {
        let labels = Translations::new(Locale::En).deck_labels();
        assert_eq!(labels.confirm, "Confirm");
        assert_eq!(labels.passed_tag, "Correct");

        let echoed = build_flashcards_deck_labels(|key| key);
        assert_eq!(echoed.view_report, "flashcardsViewReport");
    }
}
