use anyhow::{bail, Context, Result};
use serde_json::Value;
use wault_core::{AccessTokenRequest, EntryQuery, WaultClient};

pub const USAGE: &str = "\
Usage: wault <command> [args]

Commands:
  save-config                         Save WAULT_* settings to the config file
  status                              Show whether a session is stored
  sign-in                             Open the sign-in frame and wait for it
  sign-out                            Forget the stored session
  entries [path] [search]             List entries under a path
  claim <access-token>                Look up a claim (no session needed)
  claims <document-id>                List claims on a document
  request <claim,..> <doc,..> [email] Request access tokens for documents
  share <entry-id> <email> [--no-download]
  access-result <track-id>            Poll an access request
  doc-url <access-token>              Print the portal link for a token
  file-url <access-token>             Print the download link for a token";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    SaveConfig,
    Status,
    SignIn,
    SignOut,
    Entries { path: String, search: String },
    Claim { access_token: String },
    DocumentClaims { document_id: String },
    RequestTokens { claim_types: Vec<String>, document_ids: Vec<String>, email: Option<String> },
    Share { id: String, share_to: String, allow_download: bool },
    AccessResult { track_id: String },
    DocumentUrl { access_token: String },
    FileUrl { access_token: String },
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let arg = |i: usize, name: &str| -> Result<String> {
            args.get(i).cloned().with_context(|| format!("Missing <{}>\n\n{}", name, USAGE))
        };
        let list = |raw: String| -> Vec<String> {
            raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
        };

        let Some(name) = args.first() else {
            bail!("{}", USAGE);
        };
        let command = match name.as_str() {
            "save-config" => Command::SaveConfig,
            "status" => Command::Status,
            "sign-in" => Command::SignIn,
            "sign-out" => Command::SignOut,
            "entries" => Command::Entries {
                path: args.get(1).cloned().unwrap_or_else(|| "/".to_string()),
                search: args.get(2).cloned().unwrap_or_default(),
            },
            "claim" => Command::Claim { access_token: arg(1, "access-token")? },
            "claims" => Command::DocumentClaims { document_id: arg(1, "document-id")? },
            "request" => Command::RequestTokens {
                claim_types: list(arg(1, "claim,..")?),
                document_ids: list(arg(2, "doc,..")?),
                email: args.get(3).cloned(),
            },
            "share" => Command::Share {
                id: arg(1, "entry-id")?,
                share_to: arg(2, "email")?,
                allow_download: !args.iter().any(|a| a == "--no-download"),
            },
            "access-result" => Command::AccessResult { track_id: arg(1, "track-id")? },
            "doc-url" => Command::DocumentUrl { access_token: arg(1, "access-token")? },
            "file-url" => Command::FileUrl { access_token: arg(1, "access-token")? },
            other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
        };
        Ok(command)
    }
}

pub async fn run(client: &WaultClient, command: Command) -> Result<()> {
    match command {
        Command::SaveConfig => {
            client.config().save()?;
            println!("Config saved");
        }
        Command::Status => match client.credential() {
            Some(credential) => println!("Signed in until {}", credential.expires_at),
            None => println!("Not signed in"),
        },
        Command::SignIn => {
            client.ensure_signed_in().await?;
            println!("Signed in");
        }
        Command::SignOut => {
            client.sign_out()?;
            println!("Signed out");
        }
        Command::Entries { path, search } => {
            let query = EntryQuery::at(path).search(search);
            print_json(&client.load_entries(&query).await?)?;
        }
        Command::Claim { access_token } => print_json(&client.load_claim(&access_token).await?)?,
        Command::DocumentClaims { document_id } => {
            print_json(&client.load_document_claims(&document_id).await?)?
        }
        Command::RequestTokens { claim_types, document_ids, email } => {
            let mut request = AccessTokenRequest::new(claim_types, document_ids);
            if let Some(email) = email {
                request = request.email(email);
            }
            print_json(&client.request_access_tokens(&request).await?)?;
        }
        Command::Share { id, share_to, allow_download } => {
            print_json(&client.share_entry(&id, &share_to, allow_download).await?)?
        }
        Command::AccessResult { track_id } => {
            print_json(&client.access_request_result(&track_id).await?)?
        }
        Command::DocumentUrl { access_token } => println!("{}", client.document_url(&access_token)?),
        Command::FileUrl { access_token } => println!("{}", client.file_url(&access_token)?),
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
