//! Plain-text output for the terminal.

use chrono::{DateTime, Utc};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use libris_core::api::{ApiError, ApiErrorKind};
use libris_core::auth::SessionError;
use libris_core::models::{Book, Category, Identity, Loan, Paginated, User};
use libris_core::utils::{due_status, format_date, truncate};

use crate::commands::StatsReport;

const TITLE_WIDTH: usize = 36;
const AUTHOR_WIDTH: usize = 24;
const NAME_WIDTH: usize = 20;

/// Shown where a loan's book or borrower has been deleted.
const DELETED: &str = "(deleted)";

#[derive(Debug, Tabled)]
struct BookRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Available")]
    available: String,
}

impl From<&Book> for BookRow {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            title: truncate(&book.title, TITLE_WIDTH),
            author: truncate(&book.author, AUTHOR_WIDTH),
            available: book.availability_display(),
        }
    }
}

#[derive(Debug, Tabled)]
struct CategoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&Category> for CategoryRow {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            name: truncate(&category.name, NAME_WIDTH),
            description: category.description.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Email")]
    email: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: truncate(&user.username, NAME_WIDTH),
            role: user.role.as_str().to_string(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Tabled)]
struct LoanRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Book")]
    book: String,
    #[tabled(rename = "Borrower")]
    borrower: String,
    #[tabled(rename = "Due")]
    due: String,
}

impl LoanRow {
    fn new(loan: &Loan, now: DateTime<Utc>) -> Self {
        Self {
            id: loan.id.clone(),
            book: truncate(book_label(loan), TITLE_WIDTH),
            borrower: truncate(borrower_label(loan), NAME_WIDTH),
            due: due_status(loan, now),
        }
    }
}

/// Title when populated, else the id, else a deleted marker.
fn book_label(loan: &Loan) -> &str {
    loan.book_title().or_else(|| loan.book_id()).unwrap_or(DELETED)
}

fn borrower_label(loan: &Loan) -> &str {
    loan.borrower_name().or_else(|| loan.user_id()).unwrap_or(DELETED)
}

fn table<R: Tabled>(rows: impl IntoIterator<Item = R>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// One line for the user. API failures are phrased by kind; everything else
/// prints its full context chain.
pub fn error_message(err: &anyhow::Error) -> String {
    let api = err
        .downcast_ref::<ApiError>()
        .or_else(|| err.downcast_ref::<SessionError>().and_then(SessionError::api_error));

    match api {
        Some(api) => api_error_message(api),
        None => format!("{:#}", err),
    }
}

fn api_error_message(err: &ApiError) -> String {
    match err.kind() {
        ApiErrorKind::Network => err.to_string(),
        ApiErrorKind::Authentication if err.is_unauthorized() => format!(
            "{}. Sign in again with `libris login`.",
            err.message().trim_end_matches('.')
        ),
        ApiErrorKind::Authentication => err.message(),
        ApiErrorKind::Validation => err.message(),
        ApiErrorKind::Server => err.message(),
        ApiErrorKind::Decode => "The server sent a response this client does not understand.".to_string(),
    }
}

fn footer<T>(page: &Paginated<T>) {
    match (page.page, page.total_pages, page.total) {
        (Some(p), Some(pages), Some(total)) => println!("\nPage {} of {} ({} total)", p, pages, total),
        (_, _, Some(total)) => println!("\n{} of {} shown", page.len(), total),
        _ => println!("\n{} shown", page.len()),
    }
}

pub fn identity(identity: &Identity) {
    println!("{} ({})", identity.username, identity.role);
    println!("  id:    {}", identity.id);
    if let Some(email) = &identity.email {
        println!("  email: {}", email);
    }
}

pub fn book_list(books: &Paginated<Book>) {
    if books.is_empty() {
        println!("No books found.");
        return;
    }
    println!("{}", table(books.items.iter().map(BookRow::from)));
    footer(books);
}

pub fn book_detail(book: &Book) {
    println!("{}", book.title);
    println!("  by {}", book.author);
    println!("  id:        {}", book.id);
    if let Some(isbn) = &book.isbn {
        println!("  isbn:      {}", isbn);
    }
    if let Some(genre) = &book.genre {
        println!("  genre:     {}", genre);
    }
    if let Some(category) = &book.category {
        let name = category
            .populated()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| category.id().to_string());
        println!("  category:  {}", name);
    }
    if let Some(year) = book.published_year {
        println!("  published: {}", year);
    }
    println!(
        "  available: {}{}",
        book.availability_display(),
        if book.is_available() { "" } else { " (all copies out)" }
    );
    if let Some(description) = &book.description {
        println!("\n{}", description);
    }
}

pub fn category_list(categories: &Paginated<Category>) {
    if categories.is_empty() {
        println!("No categories.");
        return;
    }
    println!("{}", table(categories.items.iter().map(CategoryRow::from)));
}

pub fn category_detail(category: &Category) {
    println!("{} ({})", category.name, category.id);
    if let Some(description) = &category.description {
        println!("  {}", description);
    }
}

pub fn user_list(users: &Paginated<User>) {
    if users.is_empty() {
        println!("No users.");
        return;
    }
    println!("{}", table(users.items.iter().map(UserRow::from)));
    footer(users);
}

pub fn user_detail(user: &User) {
    println!("{} ({})", user.username, user.role);
    println!("  id:      {}", user.id);
    println!("  email:   {}", user.email);
    if let Some(created) = &user.created_at {
        println!("  joined:  {}", format_date(created));
    }
}

pub fn loan_list(loans: &Paginated<Loan>) {
    if loans.is_empty() {
        println!("No loans.");
        return;
    }
    let now = Utc::now();
    println!("{}", table(loans.items.iter().map(|loan| LoanRow::new(loan, now))));
    footer(loans);
}

pub fn loan_detail(loan: &Loan) {
    println!("Loan {} ({})", loan.id, loan.status);
    println!("  book:      {}", book_label(loan));
    println!("  borrower:  {}", borrower_label(loan));
    println!("  borrowed:  {}", format_date(&loan.borrow_date));
    println!("  due:       {} ({})", format_date(&loan.due_date), due_status(loan, Utc::now()));
    println!(
        "  extended:  {} time(s), {} left",
        loan.extension_count,
        loan.extensions_remaining()
    );
}

pub fn stats(report: &StatsReport) {
    let o = &report.overview;
    println!("Active loans:   {}", report.active_count);
    println!("Total loans:    {}", o.total_loans);
    println!("Overdue loans:  {}", o.overdue_loans);
    println!("Returned loans: {}", o.returned_loans);

    if !report.overdue.is_empty() {
        println!();
        let now = Utc::now();
        println!("{}", table(report.overdue.iter().map(|loan| LoanRow::new(loan, now))));
    }
}
