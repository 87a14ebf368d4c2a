//! CDP (Chrome DevTools Protocol) layer traits
//!
//! This module defines the abstract interfaces for CDP communication.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::types::{CallArgument, RemoteObject, TargetDescriptor, VersionDescriptor};

/// CDP response representation
#[derive(Debug, Clone)]
pub struct CdpResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<CdpError>,
}

/// CDP error representation
#[derive(Debug, Clone)]
pub struct CdpError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

/// CDP connection trait
///
/// Represents a WebSocket connection to a Chrome DevTools Protocol target.
#[async_trait]
pub trait CdpConnection: Send + Sync + std::fmt::Debug {
    /// Send a CDP command and wait for response
    async fn send_command(&self, method: &str, params: Value) -> Result<CdpResponse, crate::Error>;

    async fn close(&self) -> Result<(), crate::Error>;

    fn is_active(&self) -> bool;
}

/// CDP client trait
///
/// High-level CDP client that provides typed methods for common CDP operations.
#[async_trait]
pub trait CdpClient: Send + Sync + std::fmt::Debug {
    fn connection(&self) -> Arc<dyn CdpConnection>;

    /// Navigate to a URL and wait until `document.readyState` is complete
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<NavigationResult, crate::Error>;

    /// Evaluate JavaScript in the page, returning the value
    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, crate::Error>;

    /// Evaluate JavaScript in the page, returning a remote object handle
    async fn evaluate_handle(&self, script: &str) -> Result<RemoteObject, crate::Error>;

    /// Call a function with `this` bound to a remote object
    async fn call_function_on(
        &self,
        object_id: &str,
        function: &str,
        arguments: Vec<CallArgument>,
        return_by_value: bool,
    ) -> Result<RemoteObject, crate::Error>;

    /// Expand an array-like remote object into its element handles, in index order
    async fn array_elements(&self, object_id: &str) -> Result<Vec<RemoteObject>, crate::Error>;

    /// Release a remote object handle
    async fn release_object(&self, object_id: &str) -> Result<(), crate::Error>;

    /// Capture a screenshot
    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>, crate::Error>;

    /// Reload the page and wait for it to settle
    async fn reload(&self, ignore_cache: bool, timeout: Duration) -> Result<(), crate::Error>;

    async fn enable_domain(&self, domain: &str) -> Result<(), crate::Error>;

    /// Call a raw CDP method (returns JSON Value)
    async fn call_method(&self, method: &str, params: Value) -> Result<Value, crate::Error>;
}

/// Navigation result
#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub loader_id: Option<String>,
    pub url: String,
    /// Whether the document reached `complete` within the wait budget
    pub is_loaded: bool,
}

/// JavaScript evaluation result
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    /// Object/Array (as JSON)
    Object(Value),
}

/// Screenshot format
#[derive(Debug, Clone, Copy)]
pub enum ScreenshotFormat {
    Png,
    /// Quality 0-100
    Jpeg(u8),
}

/// CDP browser trait
///
/// Browser-level operations over the HTTP discovery endpoints.
#[async_trait]
pub trait CdpBrowser: Send + Sync + std::fmt::Debug {
    /// Create a new CDP client attached to a target's WebSocket URL
    async fn create_client(&self, ws_url: &str) -> Result<Arc<dyn CdpClient>, crate::Error>;

    /// Close all client connections
    async fn close(&self) -> Result<(), crate::Error>;

    async fn get_version(&self) -> Result<VersionDescriptor, crate::Error>;

    /// List all targets (pages, workers, etc.)
    async fn get_targets(&self) -> Result<Vec<TargetDescriptor>, crate::Error>;

    /// Open a new page target
    async fn create_target(&self, url: &str) -> Result<TargetDescriptor, crate::Error>;
}
