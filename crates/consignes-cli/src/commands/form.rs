//! `consignes form ...`: show, fill and answer forms.

use std::fmt::Write as _;
use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use consignes_client::{AnswerSink, ApiClient, Autosaver, FlushOutcome, SaveQueue};
use consignes_core::dates::{format_date, next_day, parse_date, previous_day, week_of};
use consignes_core::{AnswerValue, FieldEdit, Form, FormKey, Question, QuestionId, SaveStatus};

use crate::cli::{FormAction, FormTarget};
use crate::commands::{api_client, today};
use crate::config::ConsignesConfig;
use crate::error::{Error, Result};

/// Typed at a prompt to clear the current answer.
const CLEAR: &str = "-";
/// Typed at a prompt to stop filling.
const STOP: &str = ".";

/// Runs a form subcommand.
pub async fn handle(config: &ConsignesConfig, action: FormAction) -> Result<()> {
    let client = api_client(config)?;
    match action {
        FormAction::Show { target } => {
            let form = client.fetch_form(&target.key(today())?).await?;
            print!("{}", render_form(&form));
        }
        FormAction::Fill { target, submit } => {
            fill(config, client, &target, submit).await?;
        }
        FormAction::Answer {
            target,
            submit,
            answers,
        } => {
            let summary = answer(config, client, target.key(today())?, &answers, submit).await?;
            println!("{summary}");
        }
        FormAction::Week { date } => {
            let date = parse_date(&date, today())?;
            let mut rows = Vec::new();
            for day in week_of(date) {
                let form = client.fetch_form(&FormKey::daily(day)).await?;
                rows.push((day, form));
            }
            print!("{}", render_week(&rows));
        }
    }
    Ok(())
}

/// Interactive fill on the terminal.
async fn fill(
    config: &ConsignesConfig,
    client: ApiClient,
    target: &FormTarget,
    submit: bool,
) -> Result<()> {
    let key = target.key(today())?;
    let mut form = client.fetch_form(&key).await?;
    let queue = Arc::new(open_queue(config, client, &form));
    let reporter = tokio::spawn(report_status(queue.subscribe()));
    let autosaver = Autosaver::spawn(queue.clone(), config.autosave.debounce());

    print!("{}", render_header(&form));
    println!("(Entrée: garder, {CLEAR}: effacer, {STOP}: terminer)");
    let stdin = BufReader::new(tokio::io::stdin());
    let edited = fill_form(&mut form, &autosaver, stdin, &mut std::io::stdout()).await?;

    let closed = autosaver.close().await;
    reporter.abort();
    closed?;
    tracing::info!(form = %key, edited, "Form filled");

    if submit {
        ensure_complete(&form)?;
        let receipt = queue.submit().await?;
        println!("Formulaire envoyé ({} réponses).", receipt.saved);
    } else {
        println!("{edited} réponse(s) enregistrée(s).");
    }
    Ok(())
}

/// Applies `ID=VALUE` answers through a save queue, then optionally submits.
pub async fn answer(
    config: &ConsignesConfig,
    client: ApiClient,
    key: FormKey,
    answers: &[String],
    submit: bool,
) -> Result<String> {
    let mut form = client.fetch_form(&key).await?;
    let edits = edits_from_assignments(&mut form, answers)?;
    let queue = open_queue(config, client, &form);
    for edit in edits {
        queue.queue(edit);
    }

    let saved = match queue.flush().await? {
        FlushOutcome::Clean => 0,
        FlushOutcome::Saved { fields } => fields,
    };

    if submit {
        ensure_complete(&form)?;
        let receipt = queue.submit().await?;
        return Ok(format!(
            "{saved} réponse(s) enregistrée(s), formulaire envoyé ({} réponses).",
            receipt.saved
        ));
    }
    Ok(format!("{saved} réponse(s) enregistrée(s)."))
}

/// A save queue for `form`, seeded with the answers the backend already has.
fn open_queue(config: &ConsignesConfig, client: ApiClient, form: &Form) -> SaveQueue<ApiClient> {
    let queue = SaveQueue::new(form.key.clone(), client, config.retry.clone());
    queue.seed(
        form.answers()
            .iter()
            .map(|(id, value)| (id.clone(), value.clone())),
    );
    queue
}

async fn report_status(mut status: watch::Receiver<SaveStatus>) {
    while status.changed().await.is_ok() {
        let current = status.borrow_and_update().clone();
        if matches!(
            current,
            SaveStatus::Saved | SaveStatus::Retrying { .. } | SaveStatus::Failed(_)
        ) {
            eprintln!("  [{current}]");
        }
    }
}

/// Prompts for every question in turn, feeding edits to the autosaver.
///
/// Returns the number of edits made.
pub async fn fill_form<R, W, S>(
    form: &mut Form,
    autosaver: &Autosaver<S>,
    input: R,
    out: &mut W,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: AnswerSink + 'static,
{
    let mut lines = input.lines();
    let mut edited = 0;
    let questions = form.questions.clone();

    'questions: for question in &questions {
        write!(out, "{}", render_prompt(question, form.answer(&question.id)))?;
        loop {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = lines.next_line().await? else {
                break 'questions;
            };

            let edit = match line.trim() {
                "" => continue 'questions,
                STOP => break 'questions,
                CLEAR => FieldEdit::clear(question.id.clone()),
                raw => match AnswerValue::parse_for(&question.kind, raw) {
                    Ok(value) => FieldEdit {
                        question: question.id.clone(),
                        value,
                    },
                    Err(err) => {
                        writeln!(out, "  {err}")?;
                        continue;
                    }
                },
            };

            autosaver.edit(form.apply(edit)?);
            edited += 1;
            continue 'questions;
        }
    }
    Ok(edited)
}

/// Parses `ID=VALUE` arguments into edits applied to `form`.
pub fn edits_from_assignments(form: &mut Form, answers: &[String]) -> Result<Vec<FieldEdit>> {
    let mut edits = Vec::with_capacity(answers.len());
    for raw in answers {
        let (id, value) = parse_assignment(raw)?;
        let question = form
            .question(&id)
            .ok_or_else(|| consignes_core::Error::not_found("question", id.as_str()))?;
        let value = AnswerValue::parse_for(&question.kind, value)?;
        edits.push(form.apply(FieldEdit { question: id, value })?);
    }
    Ok(edits)
}

/// Splits `ID=VALUE`.
pub fn parse_assignment(raw: &str) -> Result<(QuestionId, &str)> {
    let (id, value) = raw.split_once('=').ok_or_else(|| {
        consignes_core::Error::validation(format!("'{raw}' is not of the form ID=VALUE"))
    })?;
    let id = id.trim();
    if id.is_empty() {
        return Err(consignes_core::Error::validation_field("id", format!("missing in '{raw}'")).into());
    }
    Ok((QuestionId::new(id), value))
}

/// Refuses submission while required questions are unanswered.
pub fn ensure_complete(form: &Form) -> Result<()> {
    let missing = form.missing_required();
    if missing.is_empty() {
        return Ok(());
    }
    Err(Error::Incomplete {
        labels: missing.iter().map(|q| q.label.clone()).collect(),
    })
}

fn title(key: &FormKey) -> String {
    match key.mode.category() {
        Some(category) => format!("Pratique délibérée: {category}, {}", format_date(key.date)),
        None => format!("Consignes du {}", format_date(key.date)),
    }
}

fn render_header(form: &Form) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title(&form.key));
    let categories = form.categories();
    if !categories.is_empty() {
        let _ = writeln!(out, "Catégories: {}", categories.join(", "));
    }
    out
}

fn render_prompt(question: &Question, current: Option<&AnswerValue>) -> String {
    let mut out = String::new();
    let marker = if question.required { "*" } else { " " };
    let _ = writeln!(out, "{marker} {} [{}]", question.label, question.kind.hint());
    if let Some(help) = question.help.as_deref().filter(|h| !h.trim().is_empty()) {
        let _ = writeln!(out, "    {help}");
    }
    if let Some(last) = question.history.first() {
        let _ = writeln!(out, "    {}: {}", format_date(last.date), last.value);
    }
    if let Some(current) = current {
        let _ = writeln!(out, "    actuel: {current}");
    }
    out
}

/// Renders a form grouped by category.
pub fn render_form(form: &Form) -> String {
    let mut out = render_header(form);
    for (category, questions) in form.by_category() {
        let heading = if category.is_empty() { "Sans catégorie" } else { category };
        let _ = writeln!(out, "\n## {heading}");
        for question in questions {
            let marker = if question.required { "*" } else { " " };
            let value = form
                .answer(&question.id)
                .map_or_else(|| "-".to_string(), ToString::to_string);
            let _ = writeln!(out, "{marker} {:<40} {value}  ({})", question.label, question.id);
        }
    }

    let missing = form.missing_required().len();
    if missing > 0 {
        let _ = writeln!(out, "\n{missing} question(s) obligatoire(s) sans réponse");
    }
    if let (Ok(previous), Ok(next)) = (previous_day(form.key.date), next_day(form.key.date)) {
        let _ = writeln!(
            out,
            "\n< {}    {} >",
            format_date(previous),
            format_date(next)
        );
    }
    out
}

/// Renders the week overview: answered questions and missing required ones per day.
pub fn render_week(days: &[(NaiveDate, Form)]) -> String {
    let mut out = String::new();
    for (day, form) in days {
        let answered = form.answers().len();
        let total = form.questions.len();
        let missing = form.missing_required().len();
        let status = if total == 0 {
            "rien à remplir".to_string()
        } else if missing == 0 {
            "complet".to_string()
        } else {
            format!("{missing} obligatoire(s) manquante(s)")
        };
        let _ = writeln!(
            out,
            "{} {}  {answered:>2}/{total:<2} {status}",
            day.format("%a"),
            format_date(*day)
        );
    }
    out
}
