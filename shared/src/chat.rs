//! Chat context assembler.
//!
//! Stateless per call: the caller re-sends the full transcript every turn and
//! gets exactly one assistant turn back. The chat surface never sees a raw
//! provider error; every failure path substitutes the fixed apology turn.

use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{ConversationTurn, Lead};
use crate::reasoning::ReasoningService;
use crate::store::LeadStore;
use crate::Result;

/// Apology substituted whenever a reply cannot be produced.
pub const CHAT_APOLOGY: &str =
    "I'm sorry, I'm having trouble responding right now. Please try again in a moment.";

/// Upper bound on transcript turns embedded in the prompt. The history the
/// model sees is the most recent window, oldest first.
pub const MAX_TRANSCRIPT_TURNS: usize = 40;

/// Produce one assistant reply for the lead's conversation.
///
/// Infallible from the caller's perspective: adapter errors, a missing
/// reasoning service, and empty replies all collapse into [`CHAT_APOLOGY`].
pub async fn assemble_reply(
    store: &dyn LeadStore,
    reasoning: Option<&dyn ReasoningService>,
    lead_id: Uuid,
    transcript: &[ConversationTurn],
) -> ConversationTurn {
    match try_reply(store, reasoning, lead_id, transcript).await {
        Ok(reply) => reply,
        Err(err) => {
            warn!(%lead_id, %err, "chat reply failed, substituting apology");
            ConversationTurn::assistant(CHAT_APOLOGY)
        }
    }
}

async fn try_reply(
    store: &dyn LeadStore,
    reasoning: Option<&dyn ReasoningService>,
    lead_id: Uuid,
    transcript: &[ConversationTurn],
) -> Result<ConversationTurn> {
    let Some(service) = reasoning else {
        return Ok(ConversationTurn::assistant(CHAT_APOLOGY));
    };

    // A missing lead or null analysis degrades to a pending notice rather
    // than failing the turn.
    let lead = store.get(lead_id).await.ok().flatten();
    let prompt = build_chat_prompt(lead.as_ref(), transcript)?;

    let reply = service.generate(&prompt, false).await?;
    let reply = reply.trim();
    if reply.is_empty() {
        return Ok(ConversationTurn::assistant(CHAT_APOLOGY));
    }

    info!(%lead_id, turns = transcript.len(), "chat reply produced");
    Ok(ConversationTurn::assistant(reply))
}

/// Build the grounded prompt: persona, analysis context (or pending notice),
/// and the capped transcript as role-labeled lines in original order.
pub fn build_chat_prompt(lead: Option<&Lead>, transcript: &[ConversationTurn]) -> Result<String> {
    let context = match lead {
        Some(lead) => match &lead.analysis {
            Some(analysis) => format!(
                "User's Analysis: {}. Name: {}.",
                serde_json::to_string(analysis)?,
                lead.name
            ),
            None => "User has uploaded a bill but analysis is pending.".to_string(),
        },
        None => "User has uploaded a bill but analysis is pending.".to_string(),
    };

    let window_start = transcript.len().saturating_sub(MAX_TRANSCRIPT_TURNS);
    let history = transcript[window_start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role.as_str(), turn.content))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(format!(
        r#"You are an expert Solar Sales Consultant for "Upload Your Bill".
Your goal is to explain the benefits of the proposed system and ULTIMATELY GET THE USER TO BOOK AN APPOINTMENT.

Context: {context}

Current Conversation:
{history}

Reply as the consultant. Be helpful, professional, but persuasive.
If they ask about technical details, explain simply.
Always try to steer towards booking a call to finalize the design."#
    ))
}
