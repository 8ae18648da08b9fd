// LibraryManagement - Personal Book Catalog
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use library_core::logging::{self, Profile};
use library_core::{Book, LibraryRepository, StoreConfig, StoreProvider};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "library-cli")]
#[command(about = "Library catalog CLI - Desktop testing tool", long_about = None)]
struct Cli {
    /// Database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Debug logging for the core
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a book
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        author: String,
        /// Image file to store as the cover
        #[arg(short, long)]
        cover: Option<PathBuf>,
    },
    /// List all books
    List,
    /// Show one book
    Show { id: i64 },
    /// Replace a book's fields
    Update {
        id: i64,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        author: String,
        #[arg(short, long, conflicts_with = "clear_cover")]
        cover: Option<PathBuf>,
        /// Drop the existing cover instead of keeping it
        #[arg(long)]
        clear_cover: bool,
    },
    /// Delete a book
    Delete { id: i64 },
    /// Print the list every time it changes (Ctrl-C to stop)
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(if cli.verbose { Profile::Verbose } else { Profile::Development });

    let config = StoreConfig::at(cli.db.unwrap_or_else(StoreConfig::default_path));
    let provider = StoreProvider::new(config);
    let repo = LibraryRepository::from_provider(&provider)
        .await
        .context("failed to open library")?;

    match cli.command {
        Commands::Add { title, author, cover } => {
            let mut book = Book::new(title, author);
            if let Some(path) = cover {
                book = book.with_cover(read_cover(&path).await?);
            }
            repo.add_book(book).outcome().await?;
            println!("Added.");
        }
        Commands::List => {
            let books = repo.books();
            if books.is_empty() {
                println!("No books yet.");
            }
            for book in &books {
                print_book(book);
            }
        }
        Commands::Show { id } => {
            let book = repo.store().get_by_id(id).await?;
            print_book(&book);
        }
        Commands::Update { id, title, author, cover, clear_cover } => {
            let existing = repo.store().get_by_id(id).await?;
            let cover_image = match cover {
                Some(path) => Some(read_cover(&path).await?),
                None if clear_cover => None,
                None => existing.cover_image,
            };
            let book = Book { id, title, author, cover_image };
            repo.update_book(book).outcome().await?;
            println!("Updated #{id}.");
        }
        Commands::Delete { id } => {
            let book = repo.store().get_by_id(id).await?;
            repo.delete_book(book).outcome().await?;
            println!("Deleted #{id}.");
        }
        Commands::Watch => {
            let mut books = repo.all_books();
            loop {
                let snapshot = books.borrow_and_update().clone();
                println!("--- {} book(s) ---", snapshot.len());
                for book in &snapshot {
                    print_book(book);
                }
                tokio::select! {
                    changed = books.changed() => {
                        if changed.is_err() {
                            anyhow::bail!("live query ended");
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
    }

    repo.shutdown();
    Ok(())
}

async fn read_cover(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read cover image {}", path.display()))
}

fn print_book(book: &Book) {
    let cover = match &book.cover_image {
        Some(bytes) => format!("{} byte cover", bytes.len()),
        None => "no cover".to_string(),
    };
    println!("#{:<4} {} by {} ({})", book.id, book.title, book.author, cover);
}
