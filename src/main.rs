use clap::Parser;
use quill::adapters::api_handler::ApiState;
use quill::adapters::file_template_store::FileTemplateStore;
use quill::cli::{Cli, Command};
use quill::config::{load_templates_from_dir, watcher::TemplateWatcher, Settings};
use quill::domain::{Template, TemplateStore, TriggerNotifier};
use quill::engine::trigger::match_trigger;
use quill::engine::{generate as generate_output, resolve_schemas, FormState, ValueTree};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;

    match cli.command() {
        Command::Serve => serve(settings).await,
        Command::Render { file } => render(&file, &settings),
        Command::Generate { file, values } => generate(&file, values.as_deref()),
        Command::Match { text } => match_text(&text, &settings),
        Command::Validate { file } => validate(&file, &settings),
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let templates_dir = settings.templates.dir.clone();

    info!("Starting Quill on {}:{}", host, port);

    let store = Arc::new(FileTemplateStore::open(&templates_dir, settings.validator())?);
    let notifier = TriggerNotifier::new(store.get_all_triggers().await?);

    // Re-read the directory and push the new trigger list when templates change
    let runtime = tokio::runtime::Handle::current();
    let store_for_watcher = store.clone();
    let notifier_for_watcher = notifier.clone();
    let _watcher = TemplateWatcher::new(store.dir(), move || {
        let store = store_for_watcher.clone();
        let notifier = notifier_for_watcher.clone();
        runtime.spawn(async move {
            if let Err(e) = store.reload().await {
                error!("Failed to reload templates: {}", e);
                return;
            }
            match store.get_all_triggers().await {
                Ok(triggers) => {
                    info!("Templates reloaded ({} triggers)", triggers.len());
                    notifier.publish(triggers);
                }
                Err(e) => error!("Failed to list triggers after reload: {}", e),
            }
        });
    })?;

    let state = ApiState::new(settings, store, notifier);
    let app = quill::create_app(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn read_template(file: &Path) -> anyhow::Result<Template> {
    let content = std::fs::read_to_string(file)?;
    Ok(Template::parse(&content)?)
}

fn render(file: &Path, settings: &Settings) -> anyhow::Result<()> {
    let template = read_template(file)?;
    let form = FormState::new(template.into_document(), settings.forms.delete_policy);
    println!("{}", serde_json::to_string_pretty(form.tree())?);
    Ok(())
}

fn generate(file: &Path, values: Option<&Path>) -> anyhow::Result<()> {
    let template = read_template(file)?;
    let values = match values {
        Some(path) => ValueTree::from_value(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => ValueTree::new(),
    };
    let document = template.document();
    let output = generate_output(document, &resolve_schemas(document), &values);
    println!("{}", template.output_format().render(&output)?);
    Ok(())
}

fn match_text(text: &str, settings: &Settings) -> anyhow::Result<()> {
    let templates = load_templates_from_dir(&settings.templates.dir, &settings.validator())?;
    let triggers: Vec<String> = templates.iter().filter_map(|(_, t)| t.trigger()).collect();
    match match_trigger(&triggers, text) {
        Some(trigger) => println!("{}", trigger),
        None => anyhow::bail!("No trigger matched"),
    }
    Ok(())
}

fn validate(file: &Path, settings: &Settings) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)?;
    let own_id = file.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let others = load_templates_from_dir(&settings.templates.dir, &settings.validator())?;
    let others: Vec<&Template> = others
        .iter()
        .filter(|(id, _)| id != own_id)
        .map(|(_, t)| t)
        .collect();

    match settings.validator().validate_text(&content, &others) {
        Ok(template) => {
            println!(
                "{}: ok (trigger {})",
                file.display(),
                template.trigger().unwrap_or_default()
            );
            Ok(())
        }
        Err(errors) => {
            for e in &errors {
                eprintln!("{}: {}", file.display(), e);
            }
            anyhow::bail!("{} validation error(s)", errors.len())
        }
    }
}
