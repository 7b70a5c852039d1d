//! Extraction prompts, one per medium.
//!
//! Each prompt describes the JSON object the parser expects back. Field names
//! here must stay in sync with `domain::analysis`.

use crate::domain::MediaKind;

const STATUS_GUIDE: &str = r#"Infer each task's status from context:
- "To Do": new work, planned actions, upcoming meetings
- "In Progress": work already started or ongoing
- "Done": finished work, or work described in the past tense
Phrases like "we built", "we shipped", "finished", "launched" mean Done.
Phrases like "we are working on", "currently doing" mean In Progress.
Phrases like "need to", "plan to", "will do" mean To Do."#;

const AUDIO_PROMPT: &str = r#"Transcribe this meeting recording and extract:
1. The full transcription of the conversation
2. Action items
3. The person responsible for each action item
4. Deadlines, if mentioned
5. The status of each action item, inferred from context
6. Key decisions made in the meeting
7. IMPORTANT: updates to work that already exists (for example "the startup launched", "hiring is finished")

{status_guide}

Report updates to existing work in "taskUpdates", not in "tasks".

Return the result as JSON:
{
  "transcription": "full transcription",
  "tasks": [
    {
      "title": "task title",
      "description": "description",
      "assignee": "responsible person",
      "deadline": "deadline if any",
      "priority": "High/Medium/Low",
      "status": "To Do/In Progress/Done",
      "isUpdate": false
    }
  ],
  "taskUpdates": [
    {
      "searchKeywords": ["keywords that identify the existing task"],
      "newStatus": "In Progress/Done",
      "reason": "why the status changed"
    }
  ],
  "decisions": ["decision 1"],
  "participants": ["participant 1"]
}"#;

const SCREEN_PROMPT: &str = r#"Analyze this screenshot and extract:
1. All visible text (OCR)
2. Tasks, projects or actions that can be identified from the interface
3. Task statuses if visible (To Do, In Progress, Done, ...)
4. Priorities if shown
5. Responsible people if visible
6. Deadlines or dates
7. Project or team names

Pay special attention to kanban boards (Trello, Jira, Asana, Notion), task
lists and checklists, calendars, planning documents, chats that mention
tasks, and slides with action items.

For each task, infer the status from the column or section it sits in, the
priority from colours or labels, and the project context.

Return the result as JSON:
{
  "extractedText": "all extracted text",
  "tasks": [
    {
      "title": "task title",
      "description": "description from context",
      "assignee": "responsible person if visible",
      "deadline": "deadline if any",
      "priority": "High/Medium/Low",
      "status": "To Do/In Progress/Done",
      "project": "project name if identified",
      "source": "where it was seen (Jira/Trello/document/chat)"
    }
  ],
  "interface_type": "interface type (Jira/Trello/Notion/document/chat/calendar)",
  "project_context": "overall project context",
  "confidence": "confidence in the extracted data (high/medium/low)"
}"#;

const VIDEO_PROMPT: &str = r#"Analyze this screen recording and extract:
1. Text shown on screen and anything said aloud
2. Tasks, projects or actions that appear or are discussed
3. Task statuses, including changes that happen during the recording
4. Priorities, responsible people and deadlines if shown
5. IMPORTANT: updates to work that already exists

{status_guide}

Report updates to existing work in "taskUpdates", not in "tasks".

Return the result as JSON:
{
  "extractedText": "text seen or heard in the recording",
  "tasks": [
    {
      "title": "task title",
      "description": "description from context",
      "assignee": "responsible person if known",
      "deadline": "deadline if any",
      "priority": "High/Medium/Low",
      "status": "To Do/In Progress/Done",
      "project": "project name if identified",
      "source": "where it was seen",
      "isUpdate": false
    }
  ],
  "taskUpdates": [
    {
      "searchKeywords": ["keywords that identify the existing task"],
      "newStatus": "In Progress/Done",
      "reason": "why the status changed"
    }
  ],
  "interface_type": "interface type",
  "project_context": "overall project context",
  "confidence": "high/medium/low"
}"#;

/// Build the extraction prompt for a medium.
///
/// `language` is the language the model writes free text in. JSON keys and
/// the status labels stay in English either way.
pub fn extraction_prompt(kind: MediaKind, language: &str) -> String {
    let template = match kind {
        MediaKind::Audio => AUDIO_PROMPT,
        MediaKind::Screen => SCREEN_PROMPT,
        MediaKind::Video => VIDEO_PROMPT,
    };

    format!(
        "{}\n\nWrite all free-text values in {}. Keep JSON keys exactly as shown.",
        template.replace("{status_guide}", STATUS_GUIDE),
        language
    )
}
