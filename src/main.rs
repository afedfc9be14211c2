use sobject_orm::config::AppConfig;
use sobject_orm::{Client, Record};

const USAGE: &str = "usage: sobject <count|first|find|query> <Type> [id | where-clause]";

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to keep the HTTP stack quiet
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("reqwest", LevelFilter::Warn)
        .parse_default_env()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, type_name) = match (args.first(), args.get(1)) {
        (Some(command), Some(type_name)) => (command.as_str(), type_name.as_str()),
        _ => anyhow::bail!(USAGE),
    };

    let config = AppConfig::load()?;
    log::info!("using {}", config.base_url());

    let client = Client::from_config(&config)?;
    // The requested type is always materializable from the command line
    client.register_type(type_name);
    let class = client.sobject(type_name)?;

    match command {
        "count" => println!("{}", class.count()?),
        "first" => match class.first()? {
            Some(record) => print_record(&record)?,
            None => println!("no {} records", class.name()),
        },
        "find" => {
            let id = args.get(2).ok_or_else(|| anyhow::anyhow!(USAGE))?;
            print_record(&class.find(id)?)?;
        }
        "query" => {
            let query = match args.get(2..).filter(|rest| !rest.is_empty()) {
                Some(rest) => class.query_where(&rest.join(" "))?,
                None => class.all()?,
            };
            let mut total = 0;
            for record in &query {
                print_record(&record?)?;
                total += 1;
            }
            log::info!("{} {} records", total, class.name());
        }
        _ => anyhow::bail!(USAGE),
    }

    Ok(())
}

fn print_record(record: &Record) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&record.to_json())?);
    Ok(())
}
