//! Canonical text composition
//!
//! Each source type serializes to a deterministic text layout before chunking,
//! so re-ingesting unchanged upstream state always yields identical chunks.
//! Lines are joined with `\n`; each body block is followed by a blank line.

use storymem_common::authoring::{Beat, Chapter, ProseBlock, Scene, Story};

fn chapter_header(chapter: &Chapter) -> String {
    format!("Chapter {}: {}", chapter.number, chapter.title)
}

/// Story document: title and status, then one header line per chapter.
/// Scenes and deeper levels are indexed by their own documents.
pub fn story_content(story: &Story, chapters: &[Chapter]) -> String {
    let mut parts = vec![
        format!("Title: {}", story.title),
        format!("Status: {}", story.status),
        String::new(),
    ];
    for chapter in chapters {
        parts.push(chapter_header(chapter));
        parts.push(String::new());
    }
    parts.join("\n")
}

/// Chapter document: header and status, then each text block's content
pub fn chapter_content(chapter: &Chapter, blocks: &[ProseBlock]) -> String {
    let mut parts = vec![
        chapter_header(chapter),
        format!("Status: {}", chapter.status),
        String::new(),
    ];
    for block in blocks.iter().filter(|b| b.is_text()) {
        parts.push(block.content.clone());
        parts.push(String::new());
    }
    parts.join("\n")
}

/// Scene document: parent chapter header when there is one, then the scene
/// header and one line per beat. Orphan scenes just omit the chapter line.
pub fn scene_content(chapter: Option<&Chapter>, scene: &Scene, beats: &[Beat]) -> String {
    let mut parts = Vec::new();
    if let Some(chapter) = chapter {
        parts.push(chapter_header(chapter));
    }
    parts.push(format!("Scene {}: {}", scene.number, scene.title));
    parts.push(String::new());
    for beat in beats {
        parts.push(format!(
            "Beat {} ({}): {}",
            beat.number, beat.beat_type, beat.intent
        ));
        parts.push(String::new());
    }
    parts.join("\n")
}

/// Beat document: header, intent, then the beat's outcome text
pub fn beat_content(beat: &Beat) -> String {
    let parts = vec![
        format!("Beat {} ({})", beat.number, beat.beat_type),
        format!("Intent: {}", beat.intent),
        String::new(),
        beat.outcome.clone(),
        String::new(),
    ];
    parts.join("\n")
}

/// Prose block document: the raw content with a trailing newline
pub fn prose_block_content(block: &ProseBlock) -> String {
    format!("{}\n", block.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn chapter(number: i32, title: &str, status: &str) -> Chapter {
        Chapter {
            id: Uuid::new_v4(),
            story_id: Uuid::new_v4(),
            number,
            title: title.into(),
            status: status.into(),
        }
    }

    fn text_block(number: i32, content: &str) -> ProseBlock {
        ProseBlock {
            id: Uuid::new_v4(),
            chapter_id: None,
            number,
            block_type: "text".into(),
            content: content.into(),
        }
    }

    #[test]
    fn test_chapter_content_exact() {
        let chapter = chapter(3, "Dawn", "draft");
        let blocks = vec![text_block(0, "Hello."), text_block(1, "World.")];

        assert_eq!(
            chapter_content(&chapter, &blocks),
            "Chapter 3: Dawn\nStatus: draft\n\nHello.\n\nWorld.\n"
        );
    }

    #[test]
    fn test_chapter_content_skips_non_text_blocks() {
        let chapter = chapter(1, "One", "final");
        let mut image = text_block(0, "https://example.com/cover.png");
        image.block_type = "image".into();
        let blocks = vec![image, text_block(1, "Hello.")];

        assert_eq!(
            chapter_content(&chapter, &blocks),
            "Chapter 1: One\nStatus: final\n\nHello.\n"
        );
    }

    #[test]
    fn test_story_content() {
        let story = Story {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            title: "The Long Night".into(),
            status: "draft".into(),
        };
        let chapters = vec![chapter(1, "Dusk", "final"), chapter(2, "Midnight", "draft")];

        assert_eq!(
            story_content(&story, &chapters),
            "Title: The Long Night\nStatus: draft\n\nChapter 1: Dusk\n\nChapter 2: Midnight\n"
        );
    }

    #[test]
    fn test_scene_content_with_parent() {
        let parent = chapter(2, "Midnight", "draft");
        let scene = Scene {
            id: Uuid::new_v4(),
            story_id: Uuid::new_v4(),
            chapter_id: Some(parent.id),
            number: 1,
            title: "The Watchtower".into(),
        };
        let beats = vec![Beat {
            id: Uuid::new_v4(),
            scene_id: scene.id,
            number: 1,
            beat_type: "action".into(),
            intent: "raise the alarm".into(),
            outcome: "The bell rings.".into(),
        }];

        assert_eq!(
            scene_content(Some(&parent), &scene, &beats),
            "Chapter 2: Midnight\nScene 1: The Watchtower\n\nBeat 1 (action): raise the alarm\n"
        );
    }

    #[test]
    fn test_orphan_scene_omits_chapter_header() {
        let scene = Scene {
            id: Uuid::new_v4(),
            story_id: Uuid::new_v4(),
            chapter_id: None,
            number: 4,
            title: "Interlude".into(),
        };

        assert_eq!(scene_content(None, &scene, &[]), "Scene 4: Interlude\n");
    }

    #[test]
    fn test_beat_content() {
        let beat = Beat {
            id: Uuid::new_v4(),
            scene_id: Uuid::new_v4(),
            number: 2,
            beat_type: "dialogue".into(),
            intent: "reveal the plan".into(),
            outcome: "She explains everything.".into(),
        };

        assert_eq!(
            beat_content(&beat),
            "Beat 2 (dialogue)\nIntent: reveal the plan\n\nShe explains everything.\n"
        );
    }

    #[test]
    fn test_prose_block_content() {
        let block = text_block(0, "Hello.");
        assert_eq!(prose_block_content(&block), "Hello.\n");
    }
}
