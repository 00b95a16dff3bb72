mod frontmatter;
mod render;
mod source;
mod tree;

pub use frontmatter::{parse_frontmatter, split_frontmatter, PageFrontmatter};
pub use render::{content_hash, render_markdown, RenderCache, DEFAULT_RENDER_CACHE_CAPACITY};
pub use source::{
    ContentError, ContentSource, FsContentSource, HttpContentSource, MemoryContentSource,
    RequestError,
};
pub use tree::{parse_mdx, source_of, ContentNode, ContentTree, MdxParseError};

pub(crate) use source::get_attribute;
