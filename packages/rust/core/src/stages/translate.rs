//! Lyric translation into the requested language.

use tracing::{debug, info, warn};

use lyricsmith_providers::CompletionOptions;
use lyricsmith_shared::{RunDelta, RunRecord, Stage};

use crate::context::{Model, StageContext};

pub(crate) const SYSTEM_PROMPT: &str = "You are a world-class polyglot and translator. Your task \
is to translate the provided song lyrics into the specified target language. Retain the poetic \
structure, stanza breaks and line breaks, and the meaning as best as possible. Do not add any \
commentary or introductory text, only the translated lyrics.";

const TEMPERATURE: f32 = 0.2;

pub async fn run(ctx: &StageContext<'_>, record: &RunRecord) -> RunDelta {
    let (Some(lyrics), Some(language)) = (record.lyrics(), record.target_language()) else {
        debug!("translation not requested");
        return RunDelta::empty();
    };

    info!(%language, "translating lyrics");
    let user = format!(
        "Please translate the following lyrics into {language}:\n\n--- LYRICS ---\n{lyrics}\n--- END OF LYRICS ---"
    );
    let options = CompletionOptions {
        temperature: TEMPERATURE,
        max_tokens: None,
    };

    match ctx
        .complete(Model::Translator, SYSTEM_PROMPT, &user, &options)
        .await
    {
        Ok(completion) => {
            if completion.truncated {
                warn!("translation was truncated at the output limit");
            }
            if completion.filtered {
                warn!("translation was filtered by the provider");
            }
            debug!(
                original_chars = lyrics.chars().count(),
                translated_chars = completion.text.chars().count(),
                "translation received"
            );
            RunDelta {
                translated_lyrics: Some(completion.text),
                ..RunDelta::empty()
            }
        }
        Err(e) => {
            warn!(error = %e, "translation failed");
            RunDelta::failure(
                Stage::Translate,
                format!("an error occurred during {}: {e}", Stage::Translate.phase()),
            )
        }
    }
}
