//! Method-call boundary for host applications.
//!
//! A host sends a method name plus an argument map (JSON-shaped) and gets
//! exactly one [`BridgeReply`] back: a result value, a structured error with
//! a stable code, or `NotImplemented` for an unknown method. Nothing panics
//! or throws past this boundary.
//!
//! | method                       | arguments                                                          | result            |
//! |------------------------------|--------------------------------------------------------------------|-------------------|
//! | `mergeMultiplePDF`           | `paths`, `outputDirPath`                                           | output path       |
//! | `createPDFFromMultipleImage` | `paths`, `outputDirPath`, `width`, `height`, `keepAspectRatio`     | output path       |
//! | `createImageFromPDF`         | `path`, `outputDirPath`, `width`, `height`, `compression`, `createOneImage` | list of paths |
//!
//! `width == 0 && height == 0` always means "no resize".

use crate::convert::{Combiner, ImagesToPdfRequest, PdfToImagesRequest};
use crate::error::CombinerError;
use crate::pipeline::document::EngineProvider;
use crate::pipeline::encode::CompressionLevel;
use crate::pipeline::pdfium::PdfiumProvider;
use crate::pipeline::scale::ScaleSpec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const MERGE_MULTIPLE_PDF: &str = "mergeMultiplePDF";
pub const CREATE_PDF_FROM_MULTIPLE_IMAGE: &str = "createPDFFromMultipleImage";
pub const CREATE_IMAGE_FROM_PDF: &str = "createImageFromPDF";

/// One incoming call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// The single reply to a [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BridgeReply {
    Success { result: Value },
    Error { code: String, message: String },
    NotImplemented,
}

impl From<CombinerError> for BridgeReply {
    fn from(e: CombinerError) -> Self {
        BridgeReply::Error {
            code: e.kind().code().to_string(),
            message: e.to_string(),
        }
    }
}

/// Routes method calls to a [`Combiner`].
pub struct Bridge<P: EngineProvider = PdfiumProvider> {
    combiner: Combiner<P>,
    runtime: Option<Handle>,
}

impl<P: EngineProvider> Clone for Bridge<P> {
    fn clone(&self) -> Self {
        Self {
            combiner: self.combiner.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<P: EngineProvider> Bridge<P> {
    /// Bind to the runtime current at construction, if there is one.
    pub fn new(combiner: Combiner<P>) -> Self {
        Self {
            combiner,
            runtime: Handle::try_current().ok(),
        }
    }

    /// Bind to an explicit runtime, for hosts that call in from their own threads.
    pub fn with_runtime(combiner: Combiner<P>, runtime: Handle) -> Self {
        Self {
            combiner,
            runtime: Some(runtime),
        }
    }

    /// Run `call` to completion and return its reply.
    pub async fn handle(&self, call: &MethodCall) -> BridgeReply {
        debug!("Bridge call: {}", call.method);
        let args = Args(&call.arguments);
        let result = match call.method.as_str() {
            MERGE_MULTIPLE_PDF => self.merge(&args).await,
            CREATE_PDF_FROM_MULTIPLE_IMAGE => self.images_to_pdf(&args).await,
            CREATE_IMAGE_FROM_PDF => self.pdf_to_images(&args).await,
            other => {
                warn!("Unknown bridge method '{}'", other);
                return BridgeReply::NotImplemented;
            }
        };
        match result {
            Ok(result) => BridgeReply::Success { result },
            Err(e) => {
                warn!("{} failed: {}", call.method, e);
                e.into()
            }
        }
    }

    /// Run `call` on the bridge's runtime and hand the reply to `on_reply`.
    ///
    /// Safe to call from any thread. Returns immediately; `on_reply` is
    /// invoked exactly once, from a runtime thread. Without a bound runtime
    /// and outside one, `on_reply` gets a `GENERATION_FAILED` error on the
    /// calling thread and no task is returned.
    pub fn dispatch<F>(&self, call: MethodCall, on_reply: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce(BridgeReply) + Send + 'static,
    {
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!("Bridge call {} dispatched without a tokio runtime", call.method);
            on_reply(
                CombinerError::Internal("no tokio runtime to run the call on".to_string()).into(),
            );
            return None;
        };
        let bridge = self.clone();
        Some(runtime.spawn(async move {
            let reply = bridge.handle(&call).await;
            on_reply(reply);
        }))
    }

    async fn merge(&self, args: &Args<'_>) -> Result<Value, CombinerError> {
        let paths = args.paths("paths")?;
        let output = PathBuf::from(args.string("outputDirPath")?);
        let done = self.combiner.merge_pdfs(&paths, &output).await?;
        Ok(single_path(done.output_paths))
    }

    async fn images_to_pdf(&self, args: &Args<'_>) -> Result<Value, CombinerError> {
        let request = ImagesToPdfRequest {
            paths: args.paths("paths")?,
            output_path: PathBuf::from(args.string("outputDirPath")?),
            scale: ScaleSpec::from_dimensions(
                args.int("width")?,
                args.int("height")?,
                args.bool("keepAspectRatio")?,
            )?,
        };
        let done = self.combiner.create_pdf_from_images(&request).await?;
        Ok(single_path(done.output_paths))
    }

    async fn pdf_to_images(&self, args: &Args<'_>) -> Result<Value, CombinerError> {
        let request = PdfToImagesRequest {
            path: PathBuf::from(args.string("path")?),
            output_path: PathBuf::from(args.string("outputDirPath")?),
            scale: ScaleSpec::from_dimensions(args.int("width")?, args.int("height")?, true)?,
            compression: CompressionLevel::new(args.int("compression")?)?,
            create_one_image: args.bool("createOneImage")?,
        };
        let done = self.combiner.create_images_from_pdf(&request).await?;
        Ok(Value::Array(
            done.output_paths
                .iter()
                .map(|p| Value::String(p.display().to_string()))
                .collect(),
        ))
    }
}

fn single_path(paths: Vec<PathBuf>) -> Value {
    paths
        .first()
        .map(|p| Value::String(p.display().to_string()))
        .unwrap_or(Value::Null)
}

/// Typed access to a call's argument map.
struct Args<'a>(&'a Map<String, Value>);

impl Args<'_> {
    fn get(&self, name: &str) -> Result<&Value, CombinerError> {
        match self.0.get(name) {
            Some(Value::Null) | None => Err(CombinerError::invalid_argument(name, "cannot be null")),
            Some(value) => Ok(value),
        }
    }

    fn string(&self, name: &str) -> Result<String, CombinerError> {
        self.get(name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CombinerError::invalid_argument(name, "expected a string"))
    }

    fn paths(&self, name: &str) -> Result<Vec<PathBuf>, CombinerError> {
        let items = self
            .get(name)?
            .as_array()
            .ok_or_else(|| CombinerError::invalid_argument(name, "expected a list of strings"))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(PathBuf::from)
                    .ok_or_else(|| CombinerError::invalid_argument(name, "expected a list of strings"))
            })
            .collect()
    }

    fn int(&self, name: &str) -> Result<i64, CombinerError> {
        self.get(name)?
            .as_i64()
            .ok_or_else(|| CombinerError::invalid_argument(name, "expected an integer"))
    }

    fn bool(&self, name: &str) -> Result<bool, CombinerError> {
        self.get(name)?
            .as_bool()
            .ok_or_else(|| CombinerError::invalid_argument(name, "expected a boolean"))
    }
}
