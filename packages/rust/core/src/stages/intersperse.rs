//! Line-by-line interleaving of original and translated lyrics.

use tracing::{debug, info, warn};

use lyricsmith_providers::CompletionOptions;
use lyricsmith_shared::{RunDelta, RunRecord, Stage};

use crate::context::{Model, StageContext};

pub(crate) const SYSTEM_PROMPT: &str = "You are a text formatting expert. Your task is to combine \
original song lyrics with their translation. For each line from the original, add the \
corresponding translated line immediately below it. Preserve stanza breaks as blank lines. Do \
not add any commentary. Simply provide the final text.";

pub async fn run(ctx: &StageContext<'_>, record: &RunRecord) -> RunDelta {
    let original = record.lyrics();
    let translated = record.translated_lyrics.as_deref().filter(|t| !t.is_empty());
    let (Some(original), Some(translated)) = (original, translated) else {
        return RunDelta::failure(
            Stage::Intersperse,
            "cannot intersperse: missing original or translated lyrics",
        );
    };
    let language = record.target_language().unwrap_or("the target language");

    info!("combining original and translated lyrics");
    let user = format!(
        "Please combine the following original lyrics with their translation into {language}. \
The output should have each original line followed by its translated line, with a blank line \
between stanzas.\nExample:\nOriginal Line 1\nTranslated Line 1\n\n\
--- ORIGINAL LYRICS ---\n{original}\n\n--- TRANSLATED LYRICS ---\n{translated}\n\nCombine them now."
    );

    match ctx
        .complete(Model::Analyst, SYSTEM_PROMPT, &user, &CompletionOptions::default())
        .await
    {
        Ok(completion) => {
            if completion.truncated {
                warn!("interspersed lyrics were truncated at the output limit");
            }
            if completion.filtered {
                warn!("interspersed lyrics were filtered by the provider");
            }
            debug!(
                chars = completion.text.chars().count(),
                "interspersed lyrics received"
            );
            RunDelta {
                interspersed_lyrics: Some(completion.text),
                ..RunDelta::empty()
            }
        }
        Err(e) => {
            warn!(error = %e, "interspersion failed");
            RunDelta::failure(
                Stage::Intersperse,
                format!("an error occurred during {}: {e}", Stage::Intersperse.phase()),
            )
        }
    }
}
