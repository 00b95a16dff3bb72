use serde::Serialize;

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum Frontmatter<'a> {
    Text(&'a str),
    Count(usize),
    Topics(Vec<TopicMeta<'a>>),
    Links(RetakeLinks<'a>),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TopicMeta<'a> {
    pub title: &'a str,
    pub slug: &'a str,
    pub anchor: String,
    pub cards: usize,
}

#[derive(Serialize, Debug)]
pub struct RetakeLinks<'a> {
    pub all: &'a str,
    pub discarded: &'a str,
}
