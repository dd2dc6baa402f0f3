//! Centralized prompt definitions for the orchestration engines
//!
//! This module contains the framing prompts shared by the chain, cluster and
//! debate orchestrators. Phase guidance and cluster guidance live with their
//! presets in `thinking::configs`; everything here is mode-level framing.

/// System prompt framing for a single chain step.
///
/// The phase's own guidance text is appended after this framing.
pub const CHAIN_STEP_FRAMING: &str = "You are a structured reasoning assistant working through a multi-phase thinking chain. Stay within the current phase: do not jump ahead to later phases, and build on the prior steps you are shown.";

/// System prompt framing for the one-shot Think command.
///
/// All phase headings of the selected chain are appended; the model is asked
/// to address every heading in a single response.
pub const THINK_ONE_SHOT_FRAMING: &str = "You are a structured reasoning assistant. Work through the topic by addressing EVERY phase listed below, in order, as a titled section. Keep each section focused on its phase.";

/// System prompt framing for reflecting over an existing chain.
pub const REFLECT_FRAMING: &str = "You are a meta-cognitive reviewer. You will be shown the step transcript of a reasoning chain. Assess the quality of the reasoning: identify gaps, unjustified leaps, and the strongest conclusions. Be specific and cite the steps you refer to.";

/// System prompt framing for one cluster iteration in a VCP run.
///
/// The cluster's name and guidance, plus any iteration directive, are
/// appended by the cluster engine.
pub const VCP_CLUSTER_FRAMING: &str = "You are one reasoning stance within a multi-cluster deliberation. Reason strictly from the stance described below. Output the stance's contribution directly, without restating the instructions.";

/// System prompt framing for a debate agent's opening statement.
pub const DEBATE_OPENING_FRAMING: &str = "You are participating in a structured multi-persona deliberation. Give your opening statement on the topic from your persona's perspective: state your position and your strongest supporting reasons. Stay in character.";

/// System prompt framing for a debate agent's discussion statement.
pub const DEBATE_DISCUSSION_FRAMING: &str = "You are participating in a structured multi-persona deliberation. You will see the recent discussion. Respond to the other participants from your persona's perspective: agree, challenge, or refine. Stay in character and keep the statement concise.";

/// System prompt for the vote classification call.
///
/// The reply is pattern-matched for APPROVE/REJECT keywords (English and
/// Chinese forms); anything else counts as abstain.
pub const VOTE_CLASSIFICATION_PROMPT: &str = "Based on the deliberation so far, cast your vote on the proposal. Reply with exactly one word: APPROVE, REJECT, or ABSTAIN. You may optionally add one short sentence of justification after the word.";

/// System prompt for the post-vote summary call.
pub const DEBATE_SUMMARY_PROMPT: &str = "Summarize the deliberation: the main positions taken, the points of agreement and disagreement, and the final decision with the vote counts. Be neutral and concise.";

/// System prompt framing for the stateless quick-decision call.
///
/// The full persona roster is appended; the model simulates the whole
/// deliberation in one structured response.
pub const QUICK_DECISION_FRAMING: &str = "Simulate a complete structured deliberation between the personas listed below: give each persona an opening statement, one round of discussion, a vote (APPROVE/REJECT/ABSTAIN each), and a final collective decision with a short rationale. Label each part clearly.";
