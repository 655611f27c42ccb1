//! Language server over stdio.
//!
//! Surfaces the lens pipeline to editors: diagnostics for drifted and
//! missing step comments, hover on spec URLs and steps, inlay check
//! marks, and per-algorithm coverage as code lenses. Document analysis
//! is cached per version and re-runs debounced after edits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use regex::Regex;
use tokio::sync::{watch, Mutex};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::debug;

use super::align::MatchGrade;
use super::coverage::{compute_coverage, CoverageSummary, GradedStep};
use super::hover::{section_markdown, step_label, step_markdown};
use super::outline::{parse_outline, OutlineStep};
use super::scan::{
    build_base_lookup, build_link_pattern, find_spec_links, find_step_notes, group_scopes,
    link_at, SpecLink, StepNote,
};
use super::{grade_notes, StepFinding};
use crate::config::LensConfig;
use crate::indexer::Indexer;
use crate::types::{SectionReport, SpecRef};

const DIAGNOSTIC_SOURCE: &str = "speclens";

/// Cache entry tied to a document version.
#[derive(Clone)]
struct Versioned<T: Clone> {
    version: i32,
    data: T,
}

struct ServerState {
    client: Client,
    indexer: Arc<Indexer>,
    fuzzy_threshold: Mutex<f64>,
    debounce: Duration,
    link_pattern: Regex,
    base_lookup: HashMap<String, String>,
    documents: DashMap<String, (i32, String)>,
    doc_links: DashMap<String, Versioned<Vec<SpecLink>>>,
    doc_scopes: DashMap<String, Versioned<Vec<(SpecLink, Vec<StepNote>)>>>,
    doc_findings: DashMap<String, Versioned<Vec<StepFinding>>>,
    doc_coverage: DashMap<String, Versioned<Vec<(SpecLink, CoverageSummary)>>>,
    report_cache: DashMap<String, SectionReport>,
    outline_cache: DashMap<String, Vec<OutlineStep>>,
    debouncers: DashMap<String, watch::Sender<()>>,
}

impl ServerState {
    fn new(client: Client, indexer: Arc<Indexer>, cfg: &LensConfig) -> Self {
        let spec_urls = indexer.catalog().spec_urls();
        Self {
            client,
            indexer,
            fuzzy_threshold: Mutex::new(cfg.fuzzy_threshold),
            debounce: Duration::from_millis(cfg.debounce_ms),
            link_pattern: build_link_pattern(&spec_urls),
            base_lookup: build_base_lookup(&spec_urls),
            documents: DashMap::new(),
            doc_links: DashMap::new(),
            doc_scopes: DashMap::new(),
            doc_findings: DashMap::new(),
            doc_coverage: DashMap::new(),
            report_cache: DashMap::new(),
            outline_cache: DashMap::new(),
            debouncers: DashMap::new(),
        }
    }

    fn links(&self, uri: &str, text: &str, version: i32) -> Vec<SpecLink> {
        if let Some(cached) = self.doc_links.get(uri) {
            if cached.version == version {
                return cached.data.clone();
            }
        }
        let links = find_spec_links(text, &self.link_pattern, &self.base_lookup);
        self.doc_links.insert(
            uri.to_string(),
            Versioned {
                version,
                data: links.clone(),
            },
        );
        links
    }

    /// Section report for `SPEC#anchor`, cached across documents. Indexes
    /// the spec on first use.
    async fn report_for(&self, spec: &str, anchor: &str) -> Option<SectionReport> {
        let key = format!("{spec}#{anchor}");
        if let Some(cached) = self.report_cache.get(&key) {
            return Some(cached.value().clone());
        }

        let spec_ref = SpecRef {
            spec: spec.to_string(),
            anchor: anchor.to_string(),
        };
        let report = match self.indexer.section_report(&spec_ref, None).await {
            Ok(report) => report,
            Err(e) => {
                debug!(reference = %spec_ref, error = %e, "Section lookup failed");
                return None;
            }
        };
        self.report_cache.insert(key, report.clone());
        Some(report)
    }

    /// Step outline of an algorithm body, cached by anchor.
    fn outline_for(&self, anchor: &str, body: &str) -> Option<Vec<OutlineStep>> {
        if let Some(cached) = self.outline_cache.get(anchor) {
            return Some(cached.value().clone());
        }
        let steps = parse_outline(body);
        if steps.is_empty() {
            return None;
        }
        self.outline_cache.insert(anchor.to_string(), steps.clone());
        Some(steps)
    }

    /// Scan, scope, and grade a document, caching per version.
    async fn analyze(&self, uri: &str, text: &str, version: i32) -> Vec<StepFinding> {
        if let Some(cached) = self.doc_findings.get(uri) {
            if cached.version == version {
                return cached.data.clone();
            }
        }

        let links = self.links(uri, text, version);
        let notes = find_step_notes(text);

        let scopes = if links.is_empty() || notes.is_empty() {
            Vec::new()
        } else {
            group_scopes(&links, &notes)
        };
        self.doc_scopes.insert(
            uri.to_string(),
            Versioned {
                version,
                data: scopes.clone(),
            },
        );

        let threshold = *self.fuzzy_threshold.lock().await;
        let mut findings = Vec::new();

        for (link, notes_in_scope) in &scopes {
            if notes_in_scope.is_empty() {
                continue;
            }
            let Some(report) = self.report_for(&link.spec, &link.anchor).await else {
                continue;
            };
            let Some(body) = report.body.as_deref().filter(|b| !b.is_empty()) else {
                continue;
            };
            let Some(steps) = self.outline_for(&link.anchor, body) else {
                continue;
            };

            findings.extend(grade_notes(notes_in_scope, &steps, &link.anchor, threshold));
        }

        self.doc_findings.insert(
            uri.to_string(),
            Versioned {
                version,
                data: findings.clone(),
            },
        );
        findings
    }

    /// Coverage per scope, derived from the analysis.
    async fn coverage(
        &self,
        uri: &str,
        text: &str,
        version: i32,
    ) -> Vec<(SpecLink, CoverageSummary)> {
        if let Some(cached) = self.doc_coverage.get(uri) {
            if cached.version == version {
                return cached.data.clone();
            }
        }

        let findings = self.analyze(uri, text, version).await;
        let scopes = match self.doc_scopes.get(uri) {
            Some(s) if s.version == version => s.data.clone(),
            _ => Vec::new(),
        };

        let mut results = Vec::new();
        for (link, notes_in_scope) in &scopes {
            if notes_in_scope.is_empty() {
                continue;
            }
            let Some(steps) = self.outline_cache.get(&link.anchor).map(|s| s.value().clone()) else {
                continue;
            };
            let scope_lines: std::collections::HashSet<usize> =
                notes_in_scope.iter().map(|n| n.line).collect();
            let graded: Vec<GradedStep> = findings
                .iter()
                .filter(|f| scope_lines.contains(&f.note.line))
                .map(|f| GradedStep {
                    note: f.note.clone(),
                    grade: f.grade,
                })
                .collect();
            results.push((
                link.clone(),
                compute_coverage(&graded, &steps, &link.anchor),
            ));
        }

        self.doc_coverage.insert(
            uri.to_string(),
            Versioned {
                version,
                data: results.clone(),
            },
        );
        results
    }

    async fn publish_diagnostics(&self, uri: &str, text: &str, version: i32) {
        let findings = self.analyze(uri, text, version).await;
        let diagnostics = build_diagnostics(uri, &findings);
        let url = uri
            .parse()
            .unwrap_or_else(|_| Url::parse("file:///").unwrap());
        self.client.publish_diagnostics(url, diagnostics, None).await;
    }

    fn forget_document(&self, uri: &str) {
        if let Some((_, tx)) = self.debouncers.remove(uri) {
            let _ = tx.send(());
        }
        self.documents.remove(uri);
        self.doc_links.remove(uri);
        self.doc_scopes.remove(uri);
        self.doc_findings.remove(uri);
        self.doc_coverage.remove(uri);
    }
}

fn build_diagnostics(uri: &str, findings: &[StepFinding]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for finding in findings {
        if !finding.grade.is_warning() {
            continue;
        }

        let label = step_label(&finding.note.number);
        let message = match finding.grade {
            MatchGrade::Missing => format!(
                "Step {label}: not found in algorithm '{}'",
                finding.algorithm
            ),
            _ => format!("Step {label}: text differs from spec"),
        };

        let end_line = finding.note.end_line.unwrap_or(finding.note.line);
        let range = Range {
            start: Position {
                line: finding.note.line as u32,
                character: finding.note.col_start as u32,
            },
            end: Position {
                line: end_line as u32,
                character: finding.note.col_end as u32,
            },
        };

        let related = (!finding.spec_text.is_empty()).then(|| {
            vec![DiagnosticRelatedInformation {
                location: Location {
                    uri: uri
                        .parse()
                        .unwrap_or_else(|_| Url::parse("file:///").unwrap()),
                    range,
                },
                message: format!("Expected: {}", finding.spec_text),
            }]
        });

        diagnostics.push(Diagnostic {
            range,
            severity: Some(DiagnosticSeverity::WARNING),
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message,
            related_information: related,
            ..Default::default()
        });
    }

    diagnostics
}

pub struct LensServer {
    state: Arc<ServerState>,
}

#[tower_lsp::async_trait]
impl LanguageServer for LensServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(options) = params.initialization_options {
            if let Some(threshold) = options.get("fuzzyThreshold").and_then(|v| v.as_f64()) {
                if (0.0..=1.0).contains(&threshold) {
                    *self.state.fuzzy_threshold.lock().await = threshold;
                }
            }
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                inlay_hint_provider: Some(OneOf::Left(true)),
                code_lens_provider: Some(CodeLensOptions {
                    resolve_provider: Some(false),
                }),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        debug!("Language server initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        let text = params.text_document.text;
        let version = params.text_document.version;
        self.state
            .documents
            .insert(uri.clone(), (version, text.clone()));
        self.state.publish_diagnostics(&uri, &text, version).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        let version = params.text_document.version;

        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        self.state
            .documents
            .insert(uri.clone(), (version, change.text));

        // Replace any pending rescan for this document.
        if let Some((_, old)) = self.state.debouncers.remove(&uri) {
            let _ = old.send(());
        }
        let (cancel_tx, mut cancel_rx) = watch::channel(());
        self.state.debouncers.insert(uri.clone(), cancel_tx);

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(state.debounce) => {
                    let Some(entry) = state.documents.get(&uri).map(|e| e.value().clone()) else {
                        return;
                    };
                    let (version, text) = entry;
                    state.publish_diagnostics(&uri, &text, version).await;
                }
                _ = cancel_rx.changed() => {}
            }
        });
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        self.state.forget_document(&uri);
        self.state
            .client
            .publish_diagnostics(params.text_document.uri, vec![], None)
            .await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params
            .text_document_position_params
            .text_document
            .uri
            .to_string();
        let pos = params.text_document_position_params.position;

        let Some((version, text)) = self.state.documents.get(&uri).map(|e| e.value().clone()) else {
            return Ok(None);
        };

        // Hovering a spec URL shows the section itself.
        let links = self.state.links(&uri, &text, version);
        if let Some(link) = link_at(&links, pos.line as usize, pos.character as usize) {
            if let Some(report) = self.state.report_for(&link.spec, &link.anchor).await {
                return Ok(Some(Hover {
                    contents: HoverContents::Markup(MarkupContent {
                        kind: MarkupKind::Markdown,
                        value: section_markdown(&report),
                    }),
                    range: Some(Range {
                        start: Position {
                            line: link.line as u32,
                            character: link.col_start as u32,
                        },
                        end: Position {
                            line: link.line as u32,
                            character: link.col_end as u32,
                        },
                    }),
                }));
            }
        }

        // Hovering a step comment shows its grade.
        let findings = self.state.analyze(&uri, &text, version).await;
        for finding in &findings {
            if finding.note.line != pos.line as usize {
                continue;
            }
            let col = pos.character as usize;
            if col < finding.note.col_start || col > finding.note.col_end {
                continue;
            }

            let end_line = finding.note.end_line.unwrap_or(finding.note.line);
            return Ok(Some(Hover {
                contents: HoverContents::Markup(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value: step_markdown(finding),
                }),
                range: Some(Range {
                    start: Position {
                        line: finding.note.line as u32,
                        character: finding.note.col_start as u32,
                    },
                    end: Position {
                        line: end_line as u32,
                        character: finding.note.col_end as u32,
                    },
                }),
            }));
        }

        Ok(None)
    }

    async fn inlay_hint(&self, params: InlayHintParams) -> Result<Option<Vec<InlayHint>>> {
        let uri = params.text_document.uri.to_string();
        let Some((version, text)) = self.state.documents.get(&uri).map(|e| e.value().clone()) else {
            return Ok(None);
        };

        let findings = self.state.analyze(&uri, &text, version).await;
        if findings.is_empty() {
            return Ok(None);
        }

        let first = params.range.start.line as usize;
        let last = params.range.end.line as usize;
        let mut hints = Vec::new();

        for finding in &findings {
            if finding.note.line < first || finding.note.line > last {
                continue;
            }

            let marker = if finding.grade.is_warning() {
                " \u{26a0}"
            } else {
                " \u{2713}"
            };
            let end_line = finding.note.end_line.unwrap_or(finding.note.line);

            hints.push(InlayHint {
                position: Position {
                    line: end_line as u32,
                    character: finding.note.col_end as u32,
                },
                label: InlayHintLabel::String(marker.to_string()),
                kind: Some(if finding.grade.is_warning() {
                    InlayHintKind::PARAMETER
                } else {
                    InlayHintKind::TYPE
                }),
                tooltip: Some(InlayHintTooltip::MarkupContent(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value: step_markdown(finding),
                })),
                padding_left: Some(true),
                padding_right: None,
                text_edits: None,
                data: None,
            });
        }

        Ok((!hints.is_empty()).then_some(hints))
    }

    async fn code_lens(&self, params: CodeLensParams) -> Result<Option<Vec<CodeLens>>> {
        let uri = params.text_document.uri.to_string();
        let Some((version, text)) = self.state.documents.get(&uri).map(|e| e.value().clone()) else {
            return Ok(None);
        };

        let coverages = self.state.coverage(&uri, &text, version).await;
        if coverages.is_empty() {
            return Ok(None);
        }

        let mut lenses = Vec::new();
        for (link, cov) in &coverages {
            let missing: Vec<String> = cov.missing.iter().map(|n| step_label(n)).collect();
            let position = Position {
                line: link.line as u32,
                character: 0,
            };

            lenses.push(CodeLens {
                range: Range {
                    start: position,
                    end: position,
                },
                command: Some(Command {
                    title: cov.summary(),
                    command: "speclens.showCoverage".to_string(),
                    arguments: Some(vec![
                        serde_json::Value::String(cov.anchor.clone()),
                        serde_json::Value::Number(serde_json::Number::from(cov.total_steps)),
                        serde_json::to_value(&missing).unwrap_or_default(),
                    ]),
                }),
                data: None,
            });
        }

        Ok((!lenses.is_empty()).then_some(lenses))
    }
}

/// Run the language server on stdio until the client disconnects.
pub async fn serve_stdio(indexer: Arc<Indexer>, cfg: &LensConfig) {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let cfg = cfg.clone();
    let (service, socket) = LspService::new(move |client| LensServer {
        state: Arc::new(ServerState::new(client, Arc::clone(&indexer), &cfg)),
    });
    Server::new(stdin, stdout, socket).serve(service).await;
}
