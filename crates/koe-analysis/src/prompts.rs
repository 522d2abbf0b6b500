//! Prompt builders for every LLM-backed stage.
//!
//! Each builder returns the full prompt text. Inputs are embedded as JSON so
//! quoting in user text cannot break the instructions. Every prompt asks for
//! a single JSON object; parsing lives next to the caller.

use koe_config::IssuesConfig;
use koe_core::entities::{ClusterId, ThreadComment};
use serde_json::json;

/// Representative samples for one cluster, as shown to the naming model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSamples {
    pub id: ClusterId,
    pub samples: Vec<String>,
}

/// Sampled texts of one majority topic for the agenda prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSamples {
    pub name: String,
    pub total: usize,
    pub samples: Vec<String>,
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".into())
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|t| format!("  - {}", t.replace('\n', " ")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn cluster_naming(
    theme: &str,
    language: &str,
    max_chars: usize,
    batch: &[ClusterSamples],
) -> String {
    let data: Vec<_> = batch
        .iter()
        .map(|c| json!({ "id": c.id.get(), "samples": c.samples }))
        .collect();
    format!(
        r#"You are a senior organizational-development consultant.
Employees sent the comments below about "{theme}". Give each group a category name.

INSTRUCTIONS:
- Labels are for a dashboard: a noun phrase of at most {max_chars} characters, no sentence.
- Name what the comments are about in one phrase. No filler such as "about ..." or "opinions on ...".
- Do not use generic names such as "Category 1", "Group 2", "Cluster 3", or "Other".
- Write the names in {language}.

EXAMPLES:
- Good: "Meeting efficiency", "Review process frustration", "Information sharing gaps"
- Bad: "About meetings being too long", "The review system is unfair"

GROUPS (id + sample comments):
<{data}>

OUTPUT (JSON only):
{{
  "clusters": [
    {{ "id": 0, "name": "category name" }}
  ]
}}"#,
        data = to_json(&data),
    )
}

pub fn issue_agenda(
    theme: &str,
    language: &str,
    total_texts: usize,
    config: &IssuesConfig,
    small_voice_label: &str,
    topics: &[TopicSamples],
    small_voices: &[String],
) -> String {
    let (majority_items, small_voice_items) = (config.majority_items, config.small_voice_items);
    let mut sections: Vec<String> = topics
        .iter()
        .map(|t| {
            format!(
                "### Topic: {} ({} comments, {} sampled)\n{}",
                t.name,
                t.total,
                t.samples.len(),
                bullet_list(&t.samples)
            )
        })
        .collect();
    if !small_voices.is_empty() {
        sections.push(format!(
            "### IMPORTANT: {small_voice_label} (rare but distinctive opinions, all of them)\n{}",
            bullet_list(small_voices)
        ));
    }
    let data = sections.join("\n\n");

    let small_voice_rules = if small_voices.is_empty() {
        format!(
            r#"- No distinctive minority opinions were detected in this run.
- Still write {small_voice_items} item(s) with title "{small_voice_label}", related_topics ["{small_voice_label}"], source_type "small_voice".
- Its insight states that no {small_voice_label} opinions were detected this time."#
        )
    } else {
        format!(
            r#"- Present the opinions in the "{small_voice_label}" data concretely, without analysis or interpretation.
- Title: "{small_voice_label}". related_topics: ["{small_voice_label}"]. source_type: "small_voice".
- The insight lists the actual opinions ("The following opinions were raised: ...").
- Do not guess at background, generalize, or add meaning the comments do not contain."#
        )
    };

    format!(
        r#"As a senior organizational-development consultant, turn employee comments into a discussion agenda.
Theme: {theme}
Comments: {total_texts}

INSTRUCTIONS:
Write {total} agenda items in total.

1. Majority issues ({majority_items}):
- From the topic data, extract organizational issues many employees feel (bottlenecks, worn-out processes).
- related_topics holds the exact topic names from the data.
- Titles invite constructive discussion ("How can we overcome ...?"), not complaints ("The ... problem").

2. {small_voice_label} ({small_voice_items}):
{small_voice_rules}

3. Write every field in {language}. urgency is one of "high", "medium", "low".

DATA:
{data}

OUTPUT (JSON only):
{{
  "issues": [
    {{
      "title": "agenda title",
      "related_topics": ["topic name"],
      "insight": "why this should be discussed",
      "urgency": "high" | "medium" | "low",
      "category": "short category",
      "source_type": "majority" | "small_voice"
    }}
  ]
}}"#,
        total = config.total_items(),
    )
}

pub fn comment_summary(language: &str, comments: &[String]) -> String {
    format!(
        r#"You read every comment employees left on a proposal. Summarize them for the person who made it.

INSTRUCTIONS:
- overall_summary: two or three sentences on the general reaction.
- key_trends: up to five recurring points, one short sentence each.
- minority_ideas: up to three ideas raised by only one or two people that deserve attention.
- Stay neutral. Do not add opinions of your own.
- Write in {language}.

COMMENTS:
<{comments}>

OUTPUT (JSON only):
{{
  "overall_summary": "...",
  "key_trends": ["..."],
  "minority_ideas": ["..."]
}}"#,
        comments = to_json(&comments),
    )
}

pub fn thread_next_steps(language: &str, max_steps: usize, comments: &[ThreadComment]) -> String {
    let transcript = comments
        .iter()
        .map(|c| format!("[{}] {}", c.author, c.content.replace('\n', " ")))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"You are a neutral, level-headed professional facilitator who steers discussions toward constructive outcomes.
Read the thread below and propose what the participants should do next.

INSTRUCTIONS:
- summary: one sentence on where the discussion stands.
- next_steps: at most {max_steps} concrete actions. title is 20 characters or fewer; detail says who does what.
- Base every step on what was actually said.
- Write in {language}.

THREAD:
{transcript}

OUTPUT (JSON only):
{{
  "summary": "...",
  "next_steps": [
    {{ "title": "...", "detail": "..." }}
  ]
}}"#
    )
}

pub fn survey_recommendations(language: &str, org_name: &str, posts: &[String]) -> String {
    format!(
        r#"You are an organizational-development expert.
Below are recent posts from the casual chat board of "{org_name}". Suggest surveys the organization could run to understand what is behind them.

INSTRUCTIONS:
- Suggest up to three surveys. If nothing in the posts warrants a survey, return an empty list.
- reason cites what in the posts prompted the suggestion.
- suggested_questions holds three to five concrete questions.
- Write in {language}.

POSTS:
<{posts}>

OUTPUT (JSON only):
{{
  "recommendations": [
    {{
      "title": "...",
      "reason": "...",
      "survey_description": "...",
      "suggested_questions": ["..."]
    }}
  ]
}}"#,
        posts = to_json(&posts),
    )
}

pub fn sentiment_scores(texts: &[String]) -> String {
    let data: Vec<_> = texts
        .iter()
        .enumerate()
        .map(|(i, t)| json!({ "index": i, "text": t }))
        .collect();
    format!(
        r#"Rate the sentiment of each comment from -1.0 (very negative) to 1.0 (very positive); 0.0 is neutral.
Return exactly one score per comment, in the same order.

COMMENTS:
<{data}>

OUTPUT (JSON only):
{{
  "scores": [
    {{ "index": 0, "score": 0.0 }}
  ]
}}"#,
        data = to_json(&data),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_prompt_embeds_ids_and_limits() {
        let prompt = cluster_naming(
            "Remote work",
            "English",
            15,
            &[ClusterSamples {
                id: ClusterId(4),
                samples: vec!["VPN drops \"every\" hour".into()],
            }],
        );
        assert!(prompt.contains("\"Remote work\""));
        assert!(prompt.contains("at most 15 characters"));
        assert!(prompt.contains("\"id\": 4"));
        assert!(prompt.contains(r#"VPN drops \"every\" hour"#));
    }

    #[test]
    fn agenda_prompt_switches_small_voice_rules() {
        let topics = [TopicSamples {
            name: "Meeting load".into(),
            total: 12,
            samples: vec!["Too many meetings".into()],
        }];
        let config = IssuesConfig::default();
        let with = issue_agenda(
            "General",
            "English",
            13,
            &config,
            "Small Voice",
            &topics,
            &["Let us try silent meetings".into()],
        );
        assert!(with.contains("Write 5 agenda items"));
        assert!(with.contains("### IMPORTANT: Small Voice"));
        assert!(with.contains("Let us try silent meetings"));

        let without = issue_agenda("General", "English", 12, &config, "Small Voice", &topics, &[]);
        assert!(without.contains("No distinctive minority opinions were detected"));
        assert!(!without.contains("### IMPORTANT"));
    }

    #[test]
    fn thread_prompt_formats_transcript() {
        let comments = [ThreadComment {
            author: "Aki".into(),
            content: "Let us\nvote".into(),
            created_at: None,
        }];
        let prompt = thread_next_steps("English", 3, &comments);
        assert!(prompt.contains("[Aki] Let us vote"));
        assert!(prompt.contains("at most 3 concrete actions"));
    }

    #[test]
    fn survey_prompt_names_org() {
        let prompt = survey_recommendations("English", "Acme", &["lunch options?".into()]);
        assert!(prompt.contains("\"Acme\""));
        assert!(prompt.contains("lunch options?"));
    }
}
