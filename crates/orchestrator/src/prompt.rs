//! Prompt assembly — pure, deterministic, bounded.
//!
//! The builder renders every resolved context block plus the user question
//! into one text prompt, in a fixed order, with no I/O. The same
//! `PromptContext` always yields byte-identical output.
//!
//! A character budget bounds the total size. When the full rendering would
//! exceed it, whole blocks degrade to their empty marker in order of
//! expendability: search results first, then memory, then favorites. The
//! question and the location block are never dropped — location is cheap,
//! always-present ground truth, while search and memory are supplementary.

use nearbot_core::context::PromptContext;
use nearbot_core::search::SearchResult;

/// Literal markers for absent blocks. The model sees these instead of an
/// empty gap, and tests assert on them.
pub const NO_HISTORY: &str = "No saved history.";
pub const NO_FAVORITES: &str = "No favorite places.";
pub const NO_RESULTS: &str = "No web results.";

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_chars: usize,
}

impl PromptBuilder {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Render the prompt, degrading blocks as needed to honor the budget.
    pub fn build(&self, ctx: &PromptContext) -> String {
        // Degradation ladder: each step blanks the least important
        // remaining block. The last rung keeps only question + location,
        // which are never sacrificed even if the budget is still exceeded.
        let ladder = [
            (true, true, true),
            (false, true, true),
            (false, false, true),
            (false, false, false),
        ];

        for (include_search, include_memory, include_favorites) in ladder {
            let rendered = self.render(ctx, include_search, include_memory, include_favorites);
            if rendered.len() <= self.max_chars {
                return rendered;
            }
        }

        self.render(ctx, false, false, false)
    }

    fn render(
        &self,
        ctx: &PromptContext,
        include_search: bool,
        include_memory: bool,
        include_favorites: bool,
    ) -> String {
        let memory = match (include_memory, ctx.memory.is_empty()) {
            (true, false) => ctx.memory.clone(),
            _ => NO_HISTORY.to_string(),
        };

        let favorites = if include_favorites && !ctx.favorites.is_empty() {
            ctx.favorites
                .iter()
                .map(|f| {
                    let rating = f
                        .rating
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "?".into());
                    format!("- {} ({}★): {}", f.name, rating, f.description)
                })
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            NO_FAVORITES.to_string()
        };

        let search = if include_search && !ctx.search.is_empty() {
            render_search(&ctx.search)
        } else {
            NO_RESULTS.to_string()
        };

        format!(
            "You are a helpful local assistant.\n\
             My location: {location}\n\
             \n\
             Here is my recent history:\n\
             {memory}\n\
             \n\
             Here are my favorite places:\n\
             {favorites}\n\
             \n\
             Here are the current web results:\n\
             {search}\n\
             \n\
             My question: \"{question}\"\n\
             \n\
             Answer in a useful, precise, and personalized way.\n",
            location = ctx.location.display_name(),
            question = ctx.question,
        )
    }
}

fn render_search(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {} — {}", i + 1, r.title, r.description))
        .collect::<Vec<_>>()
        .join("\n")
}
