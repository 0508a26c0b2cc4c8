use deckgen::{
    client_from_config, logger, storage::store_from_config, BedrockClient, Config, DocumentIndex,
    EventSink, GenerationRequest, OutlineSession,
};
use std::env;
use std::fs;
use std::sync::Arc;

struct DemoArgs {
    topic: String,
    n_slides: u32,
    documents: Vec<String>,
    serve: bool,
}

fn parse_args() -> Result<DemoArgs, Box<dyn std::error::Error>> {
    let mut args = DemoArgs {
        topic: String::new(),
        n_slides: 6,
        documents: Vec::new(),
        serve: false,
    };
    let mut words = Vec::new();
    let mut iter = env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--serve" => args.serve = true,
            "--slides" => {
                let value = iter.next().ok_or("--slides needs a number")?;
                args.n_slides = value.parse()?;
            }
            "--doc" => {
                let path = iter.next().ok_or("--doc needs a file path")?;
                args.documents.push(fs::read_to_string(&path)?);
                log::info!("📄 Loaded document {}", path);
            }
            _ => words.push(arg),
        }
    }

    args.topic = if words.is_empty() {
        "The history and future of offshore wind energy".to_string()
    } else {
        words.join(" ")
    };
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match dotenv::dotenv() {
        Ok(_) => log::info!("✅ .env file loaded successfully"),
        Err(_) => log::warn!("⚠️  No .env file found, using system environment variables"),
    }

    logger::init_with_config(logger::LoggerConfig::from_env())?;

    let config = Config::from_env();
    logger::log_config_info(&config);

    let args = parse_args()?;

    if args.serve {
        #[cfg(feature = "server")]
        {
            deckgen::server::run(config).await?;
            return Ok(());
        }
        #[cfg(not(feature = "server"))]
        {
            log::error!("❌ Built without the `server` feature");
            return Err("rebuild with --features server".into());
        }
    }

    log::info!("🔄 Creating LLM client...");
    let client = client_from_config(&config.llm).await?;
    log::info!("✅ Using {} with model {}", client.provider_name(), config.llm.model);

    let mut session = OutlineSession::new(client, &config.llm);
    let mut documents = None;
    if !args.documents.is_empty() {
        let bedrock = BedrockClient::new(config.llm.bedrock.clone()).await?;
        let embedder = bedrock
            .vector()
            .clone()
            .with_model(config.retrieval.embedding_model.as_str());
        let store = store_from_config(&config.retrieval).await?;
        let index = DocumentIndex::from_config(Arc::new(embedder), store, &config.retrieval);
        session = session.with_documents(index.clone());
        documents = Some(index);
    }
    log::info!("🧭 Provider class: {:?}", session.provider_class());

    let request = GenerationRequest::new(args.topic, args.n_slides).with_documents(args.documents);
    let (sink, mut rx) = EventSink::channel(64);

    let printer = tokio::spawn(async move {
        let mut frames = 0usize;
        while let Some(event) = rx.recv().await {
            print!("{}", event.to_sse_string());
            frames += 1;
        }
        frames
    });

    let outcome = session.run(&request, &sink).await;
    drop(sink);
    // no slide phase in the demo, so the collection can go right away
    if let Some(index) = &documents {
        if let Err(e) = index.cleanup(&request.presentation_id).await {
            log::warn!("⚠️  Could not drop document collection: {}", e);
        }
    }
    let frames = printer.await?;
    log::info!("📺 {} events written", frames);

    match outcome {
        Ok(result) => {
            log::info!("📝 Title: {}", result.title);
            for (i, slide) in result.outlines.slides.iter().enumerate() {
                let heading = slide.content.lines().next().unwrap_or_default();
                log::info!("   {}. {}", i + 1, heading);
            }
            Ok(())
        }
        Err(e) => {
            log::error!("❌ {}", e);
            Err(e.into())
        }
    }
}
