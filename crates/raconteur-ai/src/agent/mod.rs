//! Agent module: the Enhanced ReAct reasoning runtime.
//!
//! `EnhancedReActRunner` (see [`reasoning::runner`]) is this workspace's
//! single agent entry point — state-machine-driven, with a typed tool
//! contract pipeline, a complexity-aware model router, a multi-agent
//! pipeline orchestrator, a wellbeing/scam guard, a session continuity
//! cache, a self-improvement pattern miner, and a context budget manager.
//! See DESIGN.md for the earlier `AgentExecutor`/`AgentStrategyFactory`
//! duality this runner replaces.

pub mod reasoning;
