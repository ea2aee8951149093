//! Main orchestrator that runs a channel turn end to end.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use brain_core::{
    format_results, short_fingerprint, ChatMessage, FunctionCall, FunctionExecutor, InMemoryMemory,
    Mark, MemoryStore, Turn, Usage,
};
use chat_queue::{
    ChannelGate, EnqueueOutcome, MentionDetector, MessageStore, QueueManager, TriggerDecision,
    TriggerScheduler, TriggerSignals,
};
use chrono::Utc;
use indexmap::IndexMap;
use llm_adapter::AdapterEntry;
use tokio::sync::RwLock;
use tracing::{debug, error, info, trace, warn};

use crate::actions::{plan_actions, Action};
use crate::config::BotConfig;
use crate::directory::{Member, MemberDirectory, StaticDirectory};
use crate::error::{InterpretError, OrchestratorError};
use crate::functions::MemoryFunctions;
use crate::interpreter::{
    EmojiResolver, InterpretContext, InterpretedResponse, ResponseInterpreter,
};
use crate::prompt::{Prompt, PromptBuilder, PromptContext, TranscriptPrompt, DEFAULT_SYSTEM_PROMPT};
use crate::sender::{dispatch, DeliverySink};
use crate::switcher::AdapterSwitcher;

/// Host state that accompanies an inbound message.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext {
    /// Whether the bot is shown as online; "here" mentions only count then.
    pub bot_online: bool,
}

impl Default for TurnContext {
    fn default() -> Self {
        Self { bot_online: true }
    }
}

/// What [`Orchestrator::handle`] did with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The queue refused the message.
    Ignored(EnqueueOutcome),
    /// The message was the clear command; the channel was wiped.
    Cleared {
        /// Whether anything was removed.
        removed: bool,
    },
    /// A self-reported message was stored without counting toward a turn.
    Recorded(Mark),
    /// The channel is not due yet.
    Waiting {
        /// Countdown after this message.
        remaining: u32,
    },
    /// The channel is due but a turn for it is still running. The message
    /// is queued and counts toward the next turn.
    InFlight,
    /// The model replied and actions were dispatched.
    Replied {
        /// Roster index that answered.
        adapter: usize,
        /// Planned actions.
        actions: Vec<Action>,
        /// Actions the sink accepted.
        delivered: usize,
        /// New countdown.
        next_trigger: u32,
    },
    /// The model chose to stay quiet.
    Skipped {
        /// Roster index that answered.
        adapter: usize,
        /// New countdown.
        next_trigger: u32,
    },
    /// The model output could not be used; nothing was sent.
    Failed {
        /// Roster index that answered.
        adapter: usize,
        /// Why interpretation failed.
        reason: InterpretError,
        /// New countdown.
        next_trigger: u32,
    },
}

/// States of the function-call loop.
enum LoopState {
    /// Waiting on the model.
    Awaiting,
    /// Running the calls the model asked for.
    Executing(Vec<FunctionCall>),
    /// Holding a final response.
    Responding(InterpretedResponse),
}

/// Channels with a turn running.
#[derive(Default)]
struct InFlight {
    channels: Mutex<HashSet<String>>,
}

impl InFlight {
    /// Claim a channel; `None` if a turn already holds it.
    fn claim(&self, channel_id: &str) -> Option<TurnClaim<'_>> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels.insert(channel_id.to_string()).then(|| TurnClaim {
            owner: self,
            channel_id: channel_id.to_string(),
        })
    }
}

/// Releases its channel when the turn ends, however it ends.
struct TurnClaim<'a> {
    owner: &'a InFlight,
    channel_id: String,
}

impl Drop for TurnClaim<'_> {
    fn drop(&mut self) {
        self.owner
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.channel_id);
    }
}

/// Newest message timestamp each channel has already been answered up to.
///
/// Overflow is judged on messages that arrived after the last turn, so a
/// full window does not keep a channel due forever.
struct TurnLedger {
    answered: RwLock<IndexMap<String, i64>>,
    max_channels: usize,
}

impl TurnLedger {
    fn new(max_channels: usize) -> Self {
        Self {
            answered: RwLock::new(IndexMap::new()),
            max_channels,
        }
    }

    async fn since(&self, channel_id: &str) -> i64 {
        self.answered
            .read()
            .await
            .get(channel_id)
            .copied()
            .unwrap_or(i64::MIN)
    }

    async fn record(&self, channel_id: &str, newest: i64) {
        let mut answered = self.answered.write().await;
        answered.shift_remove(channel_id);
        answered.insert(channel_id.to_string(), newest);
        while answered.len() > self.max_channels {
            answered.shift_remove_index(0);
        }
    }
}

/// Main orchestrator that coordinates message processing.
///
/// The orchestrator:
/// - Queues inbound messages per channel and decides when a channel is due
/// - Assembles a prompt from the channel (or slot) window
/// - Calls the backend roster with failover
/// - Runs model-requested memory functions in a bounded loop
/// - Interprets the reply and dispatches the resulting actions
/// - Resets the channel countdown from the model's suggestion
pub struct Orchestrator<S: DeliverySink> {
    config: BotConfig,
    /// Effective system prompt.
    system_prompt: String,
    queue: Arc<QueueManager>,
    scheduler: TriggerScheduler,
    /// Serializes enqueue and evaluation per channel.
    gate: ChannelGate,
    /// Keeps one turn per channel running at a time.
    in_flight: InFlight,
    mention: MentionDetector,
    switcher: AdapterSwitcher,
    interpreter: ResponseInterpreter,
    prompt: Box<dyn PromptBuilder>,
    directory: Arc<dyn MemberDirectory>,
    memory: Arc<dyn MemoryStore>,
    functions: Arc<dyn FunctionExecutor>,
    /// Set when the host supplied its own executor.
    custom_functions: bool,
    ledger: TurnLedger,
    sink: S,
}

impl<S: DeliverySink> Orchestrator<S> {
    /// Create an orchestrator with in-memory queue and memory stores.
    pub fn new(config: BotConfig, switcher: AdapterSwitcher, sink: S) -> Result<Self, OrchestratorError> {
        config.validate()?;

        let queue = Arc::new(QueueManager::in_memory(config.queue.clone())?);
        let scheduler = TriggerScheduler::with_config(config.trigger.clone())?;
        let memory: Arc<dyn MemoryStore> = Arc::new(InMemoryMemory::default());
        let functions: Arc<dyn FunctionExecutor> =
            Arc::new(MemoryFunctions::new(memory.clone(), queue.clone()));
        let emoji = EmojiResolver::new(config.emoji_table.clone(), config.emoji_fallback_id.clone());
        let system_prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        info!(
            bot = %config.bot_id,
            prompt = %short_fingerprint(&system_prompt),
            reply_mode = %config.reply_mode,
            adapters = config.adapters.len(),
            "orchestrator initialized"
        );

        Ok(Self {
            mention: MentionDetector::new(config.bot_id.clone()),
            interpreter: ResponseInterpreter::new(config.reply_mode, emoji),
            ledger: TurnLedger::new(config.queue.max_channels),
            system_prompt,
            queue,
            scheduler,
            gate: ChannelGate::new(),
            in_flight: InFlight::default(),
            switcher,
            prompt: Box::new(TranscriptPrompt),
            directory: Arc::new(StaticDirectory::new()),
            memory,
            functions,
            custom_functions: false,
            sink,
            config,
        })
    }

    /// Create an orchestrator from environment variables.
    ///
    /// The adapter roster comes from `CHIME_ADAPTERS`.
    pub fn from_env(sink: S) -> Result<Self, OrchestratorError> {
        let config = BotConfig::from_env()?;
        let switcher = AdapterSwitcher::from_entries(config.adapters.clone())?;
        Self::new(config, switcher, sink)
    }

    /// Use a different message store.
    pub fn with_store(mut self, store: Arc<dyn MessageStore>) -> Result<Self, OrchestratorError> {
        self.queue = Arc::new(QueueManager::new(store, self.config.queue.clone())?);
        if !self.custom_functions {
            self.functions = Arc::new(MemoryFunctions::new(self.memory.clone(), self.queue.clone()));
        }
        Ok(self)
    }

    /// Use a member directory for mention resolution.
    pub fn with_directory(mut self, directory: Arc<dyn MemberDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Use a different long-term memory store.
    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = memory;
        if !self.custom_functions {
            self.functions = Arc::new(MemoryFunctions::new(self.memory.clone(), self.queue.clone()));
        }
        self
    }

    /// Replace the memory functions with another executor.
    pub fn with_function_executor(mut self, functions: Arc<dyn FunctionExecutor>) -> Self {
        self.functions = functions;
        self.custom_functions = true;
        self
    }

    /// Resolve emoji with this resolver.
    pub fn with_emoji_resolver(mut self, emoji: EmojiResolver) -> Self {
        self.interpreter = ResponseInterpreter::new(self.config.reply_mode, emoji);
        self
    }

    /// Assemble prompts with this builder.
    pub fn with_prompt_builder(mut self, prompt: Box<dyn PromptBuilder>) -> Self {
        self.prompt = prompt;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// The message queue.
    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    /// The adapter roster.
    pub fn switcher(&self) -> &AdapterSwitcher {
        &self.switcher
    }

    /// The delivery sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Current countdown of a channel, if it has been seen.
    pub async fn trigger_counter(&self, channel_id: &str) -> Option<u32> {
        self.scheduler.counter(channel_id).await
    }

    /// Handle one inbound message.
    ///
    /// The channel's gate covers enqueue and evaluation only, so messages
    /// keep being recorded while a turn waits on the backend. A channel runs
    /// one turn at a time; a message that finds its channel due while a turn
    /// is running returns [`TurnOutcome::InFlight`]. Adapter exhaustion and
    /// non-transport backend errors are returned as errors and leave the
    /// channel's countdown untouched.
    pub async fn handle(
        &self,
        message: impl Into<ChatMessage>,
        ctx: &TurnContext,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let mut message = message.into();
        let channel_id = message.channel_id.clone();

        let reason = {
            let _gate = self.gate.enter(&channel_id).await;

            match self.queue.enqueue(&mut message).await? {
                EnqueueOutcome::Accepted => {}
                EnqueueOutcome::ClearCommand => {
                    let removed = self.queue.clear_channel(&channel_id).await?;
                    info!(channel = %channel_id, removed, "channel cleared by command");
                    return Ok(TurnOutcome::Cleared { removed });
                }
                other => {
                    debug!(channel = %channel_id, id = %message.id, outcome = ?other, "message ignored");
                    return Ok(TurnOutcome::Ignored(other));
                }
            }

            if message.mark != Mark::Added {
                trace!(channel = %channel_id, mark = ?message.mark, "self-reported message recorded");
                return Ok(TurnOutcome::Recorded(message.mark));
            }

            let signals = self.signals(&message, ctx).await?;
            match self.scheduler.evaluate(&channel_id, signals).await {
                TriggerDecision::Idle { remaining } => return Ok(TurnOutcome::Waiting { remaining }),
                TriggerDecision::Due(reason) => reason,
            }
        };

        let Some(_claim) = self.in_flight.claim(&channel_id) else {
            debug!(channel = %channel_id, id = %message.id, "turn already running");
            return Ok(TurnOutcome::InFlight);
        };
        info!(channel = %channel_id, reason = ?reason, "TURN_START");
        self.run_turn(&channel_id).await
    }

    async fn signals(
        &self,
        message: &ChatMessage,
        ctx: &TurnContext,
    ) -> Result<TriggerSignals, OrchestratorError> {
        let channel_id = &message.channel_id;
        let slot_size = self.queue.slot_size();
        let since = self.ledger.since(channel_id).await;
        let pending = |window: &[ChatMessage]| window.iter().filter(|m| m.timestamp > since).count();

        let window = self.queue.window(channel_id, slot_size).await?;
        let slot_overflow = match self.queue.slot_for(channel_id) {
            Some(slot) => {
                let slot = slot.to_vec();
                pending(&self.queue.mixed_window(&slot, slot_size).await?) > slot_size
            }
            None => false,
        };

        Ok(TriggerSignals {
            window_overflow: pending(&window) > slot_size,
            slot_overflow,
            mentioned: self.mention.detect(&message.content, ctx.bot_online).is_some(),
        })
    }

    async fn run_turn(&self, channel_id: &str) -> Result<TurnOutcome, OrchestratorError> {
        let mut window = self.queue.context_window(channel_id).await?;
        let excess = window.len().saturating_sub(self.queue.slot_size());
        window.drain(..excess);

        let members = self.directory.members(channel_id).await;
        let core_memory = self.memory.core_sections().await.unwrap_or_else(|e| {
            warn!(error = %e, "core memory unavailable");
            Vec::new()
        });
        let prompt = self.prompt.build(
            &self.system_prompt,
            &window,
            &PromptContext {
                channel_id,
                bot_id: &self.config.bot_id,
                members: &members,
                core_memory: &core_memory,
                now: Utc::now().timestamp_millis(),
            },
        );

        let (adapter, response) = match self.converse(channel_id, prompt, &members).await {
            Ok(result) => result,
            Err(e) => {
                error!(channel = %channel_id, error = %e, "TURN_ABORTED");
                return Err(e);
            }
        };
        if let Some(newest) = window.last().map(|m| m.timestamp) {
            self.ledger.record(channel_id, newest).await;
        }
        if let Some(usage) = response.usage() {
            debug!(
                channel = %channel_id,
                adapter,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "turn usage"
            );
        }

        match response {
            InterpretedResponse::Success {
                ref next_trigger,
                ref logic,
                ..
            } => {
                let actions = plan_actions(&response);
                let delivered = dispatch(&self.sink, &actions).await;
                let next_trigger = self.scheduler.reset(channel_id, *next_trigger).await;
                info!(
                    channel = %channel_id,
                    adapter,
                    actions = actions.len(),
                    delivered,
                    next_trigger,
                    logic = ?logic,
                    "TURN_REPLIED"
                );
                Ok(TurnOutcome::Replied {
                    adapter,
                    actions,
                    delivered,
                    next_trigger,
                })
            }
            InterpretedResponse::Skip {
                next_trigger, logic, ..
            } => {
                let next_trigger = self.scheduler.reset(channel_id, next_trigger).await;
                info!(channel = %channel_id, adapter, next_trigger, logic = ?logic, "TURN_SKIPPED");
                Ok(TurnOutcome::Skipped {
                    adapter,
                    next_trigger,
                })
            }
            InterpretedResponse::Fail {
                raw_content,
                reason,
                ..
            } => Ok(self.fail_turn(channel_id, adapter, reason, &raw_content).await),
            // The loop only stops on a call when the depth is spent.
            InterpretedResponse::FunctionCall { .. } => {
                let reason = InterpretError::DepthExceeded(self.config.max_function_depth);
                Ok(self.fail_turn(channel_id, adapter, reason, "").await)
            }
        }
    }

    /// Call the model, running requested functions until it gives a final answer.
    async fn converse(
        &self,
        channel_id: &str,
        prompt: Prompt,
        members: &[Member],
    ) -> Result<(usize, InterpretedResponse), OrchestratorError> {
        let Prompt { system, mut turns } = prompt;
        let max_depth = self.config.max_function_depth;
        let mut depth = 0;
        let mut usage: Option<Usage> = None;
        let mut adapter = 0;
        let mut state = LoopState::Awaiting;

        loop {
            state = match state {
                LoopState::Awaiting => {
                    let (index, reply) = self.switcher.call_with_failover(&system, &turns).await?;
                    adapter = index;
                    usage = Usage::merge(usage, reply.usage);
                    let raw = reply.content_text();
                    if self.config.debug_raw_output {
                        info!(channel = %channel_id, adapter = index, raw = %raw, "MODEL_OUTPUT");
                    } else {
                        trace!(channel = %channel_id, adapter = index, raw = %raw, "MODEL_OUTPUT");
                    }

                    let ctx = InterpretContext {
                        channel_id,
                        members,
                        usage,
                    };
                    match self.interpreter.interpret(&reply.content, &ctx).await {
                        InterpretedResponse::FunctionCall { .. } if depth >= max_depth => {
                            warn!(channel = %channel_id, depth, "FUNCTION_DEPTH_EXCEEDED");
                            LoopState::Responding(InterpretedResponse::Fail {
                                raw_content: raw,
                                reason: InterpretError::DepthExceeded(max_depth),
                                usage,
                            })
                        }
                        InterpretedResponse::FunctionCall { calls, .. } => {
                            turns.push(Turn::assistant(raw));
                            LoopState::Executing(calls)
                        }
                        other => LoopState::Responding(other),
                    }
                }
                LoopState::Executing(calls) => {
                    depth += 1;
                    debug!(channel = %channel_id, depth, calls = calls.len(), "FUNCTION_ROUND");
                    let mut results = Vec::with_capacity(calls.len());
                    for call in &calls {
                        results.push(self.functions.execute(call, channel_id).await);
                    }
                    turns.push(Turn::user(format_results(&results)));
                    LoopState::Awaiting
                }
                LoopState::Responding(response) => return Ok((adapter, response)),
            };
        }
    }

    async fn fail_turn(
        &self,
        channel_id: &str,
        adapter: usize,
        reason: InterpretError,
        raw_content: &str,
    ) -> TurnOutcome {
        warn!(channel = %channel_id, adapter, reason = %reason, "TURN_FAILED");
        if let Some(diagnostics) = &self.config.diagnostics_channel {
            let report = format!("[{channel_id}] {reason}\n{raw_content}");
            if let Err(e) = self.sink.send(diagnostics, &report).await {
                warn!(channel = %diagnostics, error = %e, "diagnostics report failed");
            }
        }
        let next_trigger = self.scheduler.reset(channel_id, None).await;
        TurnOutcome::Failed {
            adapter,
            reason,
            next_trigger,
        }
    }

    /// Forget one channel.
    pub async fn clear_channel(&self, channel_id: &str) -> Result<bool, OrchestratorError> {
        Ok(self.queue.clear_channel(channel_id).await?)
    }

    /// Forget everything one sender said.
    pub async fn clear_by_sender(&self, sender_id: &str) -> Result<bool, OrchestratorError> {
        Ok(self.queue.clear_by_sender(sender_id).await?)
    }

    /// Forget every group channel.
    pub async fn clear_all(&self) -> Result<bool, OrchestratorError> {
        Ok(self.queue.clear_all().await?)
    }

    /// Forget every private channel.
    pub async fn clear_private_all(&self) -> Result<bool, OrchestratorError> {
        Ok(self.queue.clear_private_all().await?)
    }

    /// Replace the adapter roster.
    pub async fn update_adapters(&self, entries: Vec<AdapterEntry>) -> Result<(), OrchestratorError> {
        self.switcher.update_config(entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::RecordingSink;
    use brain_core::{Adapter, InboundChat};
    use mock_brain::{FailingAdapter, ScriptedAdapter};

    fn config(min: u32, max: u32) -> BotConfig {
        BotConfig::builder()
            .bot_id("bot")
            .trigger_range(min, max)
            .mention_probability(1.0)
            .build()
    }

    fn orchestrator(config: BotConfig, adapters: Vec<Arc<dyn Adapter>>) -> Orchestrator<RecordingSink> {
        Orchestrator::new(config, AdapterSwitcher::with_adapters(adapters), RecordingSink::new()).unwrap()
    }

    fn msg(id: &str, channel: &str, content: &str, ts: i64) -> ChatMessage {
        ChatMessage::new(id, channel, "u1", content, ts).with_sender_name("Ann")
    }

    #[tokio::test]
    async fn test_waits_until_countdown() {
        let adapter = Arc::new(ScriptedAdapter::with_replies("s", [r#"{"status":"skip","nextReplyIn":3}"#]));
        let orch = orchestrator(config(3, 3), vec![adapter.clone()]);
        let ctx = TurnContext::default();

        assert_eq!(
            orch.handle(msg("1", "g1", "a", 1), &ctx).await.unwrap(),
            TurnOutcome::Waiting { remaining: 2 }
        );
        assert_eq!(
            orch.handle(msg("2", "g1", "b", 2), &ctx).await.unwrap(),
            TurnOutcome::Skipped {
                adapter: 0,
                next_trigger: 3
            }
        );
        assert_eq!(adapter.call_count(), 1);
        assert_eq!(orch.trigger_counter("g1").await, Some(3));
    }

    #[tokio::test]
    async fn test_duplicate_is_ignored() {
        let orch = orchestrator(config(5, 5), Vec::new());
        let ctx = TurnContext::default();
        orch.handle(msg("1", "g1", "a", 1), &ctx).await.unwrap();
        assert_eq!(
            orch.handle(msg("1", "g1", "a", 1), &ctx).await.unwrap(),
            TurnOutcome::Ignored(EnqueueOutcome::Duplicate)
        );
    }

    #[tokio::test]
    async fn test_clear_command() {
        let orch = orchestrator(config(5, 5), Vec::new());
        let ctx = TurnContext::default();
        orch.handle(msg("1", "g1", "a", 1), &ctx).await.unwrap();

        let clear = orch.config().queue.clear_memory_command.clone();
        assert_eq!(
            orch.handle(msg("2", "g1", &clear, 2), &ctx).await.unwrap(),
            TurnOutcome::Cleared { removed: true }
        );
        assert!(orch.queue().window("g1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_self_report_is_recorded_without_counting() {
        let mut config = config(5, 5);
        config.queue.self_report_marks.insert(Mark::Llm);
        let orch = orchestrator(config, Vec::new());
        let message = msg("1", "g1", "I said this", 1).with_mark(Mark::Llm);

        assert_eq!(
            orch.handle(message, &TurnContext::default()).await.unwrap(),
            TurnOutcome::Recorded(Mark::Llm)
        );
        assert_eq!(orch.trigger_counter("g1").await, None);
    }

    #[tokio::test]
    async fn test_mention_makes_channel_due() {
        let adapter = Arc::new(ScriptedAdapter::with_replies(
            "s",
            [r#"{"status":"success","finalReply":"yes?"}"#],
        ));
        let orch = orchestrator(config(9, 9), vec![adapter]);
        let inbound = InboundChat {
            channel_id: "g1".into(),
            sender_id: "u1".into(),
            sender_name: Some("Ann".into()),
            content: r#"<at id="bot"/> are you there"#.into(),
            message_id: "1".into(),
            timestamp: 1,
        };

        let outcome = orch.handle(inbound, &TurnContext::default()).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Replied { delivered: 1, .. }));
        assert_eq!(orch.sink().sent_to("g1").await, vec!["yes?"]);
    }

    #[tokio::test]
    async fn test_exhaustion_leaves_counter_untouched() {
        let orch = orchestrator(
            config(3, 3),
            vec![
                Arc::new(FailingAdapter::network("a")),
                Arc::new(FailingAdapter::network("b")),
            ],
        );
        let ctx = TurnContext::default();
        orch.handle(msg("1", "g1", "a", 1), &ctx).await.unwrap();

        let err = orch.handle(msg("2", "g1", "b", 2), &ctx).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::AdaptersExhausted { attempts: 2, .. }));
        // Not reset: the channel is still due for the next message.
        assert_eq!(orch.trigger_counter("g1").await, Some(1));
        assert!(orch.sink().actions().await.is_empty());
    }

    #[tokio::test]
    async fn test_function_depth_is_bounded() {
        let call = r#"{"status":"function","functions":[{"name":"conversation_search","params":{"query":"a"}}]}"#;
        let adapter = Arc::new(ScriptedAdapter::with_replies("s", [call, call, call]));
        let config = BotConfig::builder()
            .trigger_range(1, 1)
            .max_function_depth(1)
            .diagnostics_channel("diag")
            .build();
        let orch = orchestrator(config, vec![adapter.clone()]);

        let outcome = orch.handle(msg("1", "g1", "a", 1), &TurnContext::default()).await.unwrap();
        assert!(matches!(
            outcome,
            TurnOutcome::Failed {
                reason: InterpretError::DepthExceeded(1),
                ..
            }
        ));
        assert_eq!(adapter.call_count(), 2);
        let report = orch.sink().sent_to("diag").await;
        assert_eq!(report.len(), 1);
        assert!(report[0].starts_with("[g1] function call depth 1 exceeded"));
    }

    #[tokio::test]
    async fn test_full_window_does_not_stay_due() {
        let adapter = Arc::new(ScriptedAdapter::with_replies(
            "s",
            [r#"{"status":"skip","nextReplyIn":9}"#, r#"{"status":"skip","nextReplyIn":9}"#],
        ));
        let config = BotConfig::builder()
            .bot_id("bot")
            .trigger_range(9, 9)
            .slot_size(2)
            .build();
        let orch = orchestrator(config, vec![adapter.clone()]);
        let ctx = TurnContext::default();

        orch.handle(msg("1", "g1", "a", 1), &ctx).await.unwrap();
        orch.handle(msg("2", "g1", "b", 2), &ctx).await.unwrap();
        // Third message overflows a window of two.
        assert!(matches!(
            orch.handle(msg("3", "g1", "c", 3), &ctx).await.unwrap(),
            TurnOutcome::Skipped { .. }
        ));
        // The window is still full, but nothing new has arrived since.
        assert!(matches!(
            orch.handle(msg("4", "g1", "d", 4), &ctx).await.unwrap(),
            TurnOutcome::Waiting { .. }
        ));
        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_admin_clear() {
        let orch = orchestrator(config(9, 9), Vec::new());
        let ctx = TurnContext::default();
        orch.handle(msg("1", "g1", "a", 1), &ctx).await.unwrap();
        orch.handle(msg("2", "private:u1", "b", 2), &ctx).await.unwrap();

        assert!(orch.clear_all().await.unwrap());
        assert!(!orch.queue().window("private:u1", 5).await.unwrap().is_empty());
        assert!(orch.clear_private_all().await.unwrap());
        assert!(!orch.clear_by_sender("u1").await.unwrap());
    }
}
