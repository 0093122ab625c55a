use std::io::{self, Write};

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use web3name::{AddressOptions, DomainNameOptions, RecordOptions, Web3Name, Web3NameConfig};

fn print_menu() -> io::Result<()> {
    println!("\n========================================");
    println!("          Web3 Name Resolver");
    println!("========================================");
    println!("1. Resolve a name to an address");
    println!("2. Find the name of an address");
    println!("3. List every name of an address");
    println!("4. Read a text record");
    println!("5. Read the content hash");
    println!("6. Show metadata and avatar");
    println!("7. Batch reverse lookup");
    println!("8. Exit");
    println!("========================================");
    print!("Choose an option: ");
    io::stdout().flush()
}

fn read_input(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Comma separated list, blanks dropped.
fn read_list(prompt: &str) -> io::Result<Vec<String>> {
    Ok(read_input(prompt)?
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

/// TLD list or chain list for reverse lookups.
fn read_query() -> anyhow::Result<DomainNameOptions> {
    let chains = read_list("Chain IDs to search (comma separated, blank for all): ")?;
    let query_chain_id_list = chains
        .iter()
        .map(|chain| chain.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .context("chain IDs must be numbers")?;
    let query_tld_list = if query_chain_id_list.is_empty() {
        read_list("TLDs to search (comma separated, blank for all): ")?
    } else {
        Vec::new()
    };
    Ok(DomainNameOptions {
        query_chain_id_list,
        query_tld_list,
        ..Default::default()
    })
}

fn show(label: &str, value: Option<String>) {
    match value {
        Some(value) => println!("\n✅ {}: {}", label, value),
        None => println!("\n❌ No {} found.", label.to_lowercase()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("web3name=info")),
        )
        .init();

    let config = Web3NameConfig::from_env().context("loading configuration")?;
    tracing::info!(
        hub_chain_id = config.hub_chain_id,
        dev = config.is_dev,
        "starting resolver"
    );
    let web3name = Web3Name::new(config)?;

    println!("\n🚀 Welcome to the Web3 Name Resolver!");
    println!("Resolve .bnb, .arb, .eth, .lens, .crypto, .sol and every hub TLD.");

    loop {
        print_menu()?;

        let choice = read_input("")?;
        if choice == "8" {
            println!("\n👋 Goodbye!");
            break;
        }

        let outcome: anyhow::Result<()> = async {
            match choice.as_str() {
                "1" => {
                    let name = read_input("\nEnter a name (e.g., spaceid.bnb): ")?;
                    println!("🔍 Resolving {}...", name);
                    let address = web3name.get_address(&name, &AddressOptions::default()).await?;
                    show("Address", address);
                }

                "2" => {
                    let address = read_input("\nEnter a wallet address (0x...): ")?;
                    let options = read_query()?;
                    println!("🔍 Looking up the primary name...");
                    let name = web3name.get_domain_name(&address, &options).await?;
                    show("Name", name);
                }

                "3" => {
                    let address = read_input("\nEnter a wallet address (0x...): ")?;
                    let options = read_query()?;
                    let names = web3name.get_domain_names(&address, &options).await?;
                    if names.is_empty() {
                        println!("\n📭 No verified names.");
                    } else {
                        println!("\n📖 Verified names:");
                        for name in names {
                            println!("   {}", name);
                        }
                    }
                }

                "4" => {
                    let name = read_input("\nEnter a name: ")?;
                    let key = read_input("Record key (e.g., avatar, url, com.twitter): ")?;
                    let record = web3name
                        .get_domain_record(&name, &key, &RecordOptions::default())
                        .await?;
                    show("Record", record);
                }

                "5" => {
                    let name = read_input("\nEnter a name: ")?;
                    let hash = web3name
                        .get_content_hash(&name, &RecordOptions::default())
                        .await?;
                    show("Content hash", hash);
                }

                "6" => {
                    let name = read_input("\nEnter a name: ")?;
                    let options = RecordOptions::default();
                    match web3name.get_metadata(&name, &options).await? {
                        Some(metadata) => {
                            println!("\n✅ Metadata:");
                            println!("{}", serde_json::to_string_pretty(&metadata)?);
                        }
                        None => println!("\n❌ No metadata found."),
                    }
                    show("Avatar", web3name.get_domain_avatar(&name, &options).await?);
                }

                "7" => {
                    let addresses = read_list("\nEnter addresses (comma separated): ")?;
                    let options = read_query()?;
                    match web3name.batch_get_domain_name(&addresses, &options).await? {
                        Some(entries) => {
                            println!("\n   {:<44} {}", "Address", "Name");
                            println!("   {}", "-".repeat(70));
                            for entry in entries {
                                println!(
                                    "   {:<44} {}",
                                    entry.address,
                                    entry.domain.as_deref().unwrap_or("-")
                                );
                            }
                        }
                        None => println!("\n❌ Batch lookup failed."),
                    }
                }

                _ => println!("\n❌ Invalid option. Please choose 1-8."),
            }
            Ok(())
        }
        .await;

        if let Err(e) = outcome {
            println!("\n❌ {}", e);
        }
    }

    Ok(())
}
