use std::io::{self, Write};

use crossterm::cursor::MoveUp;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::{Print, StyledContent, Stylize};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{cursor, execute, queue};

use onu_core::{Card, Color, Notice, Presenter, PromptError, Prompter, Session, TurnOption};

/// 终端前端：彩色输出 + 方向键选择
#[derive(Debug, Default)]
pub struct Terminal;

fn paint(text: String, color: &Color) -> StyledContent<String> {
    match color {
        Color::Red => text.red(),
        Color::Green => text.green(),
        Color::Blue => text.blue(),
        Color::Yellow => text.yellow(),
        Color::Purple => text.magenta(),
        Color::Turquoise => text.cyan(),
        Color::Colorless | Color::Other(_) => text.stylize(),
    }
}

fn paint_card(card: &Card) -> StyledContent<String> {
    paint(card.label(), &card.color)
}

impl Terminal {
    pub fn new() -> Terminal {
        Terminal
    }

    pub fn welcome(&self) {
        println!("Welcome to {}", "Onu!".yellow().bold());
    }

    /// 读取一行非空输入
    pub async fn ask_line(&mut self, message: &str) -> Result<String, PromptError> {
        loop {
            println!("{} {}", "?".green().bold(), message.bold());
            let line = blocking(read_line).await?;
            let line = line.trim();
            if !line.is_empty() {
                return Ok(line.to_string());
            }
        }
    }

    pub fn report_error(&self, message: &str) {
        eprintln!("{} {}", "✖".red(), message.red());
    }
}

impl Presenter for Terminal {
    fn show_deck(&mut self, session: &Session) {
        let top = session.top_card.as_ref().map(paint_card).unwrap_or_else(|| "-".to_string().stylize());
        println!("{}{}", "Top Card: ".bold(), top);
        println!("{}", "Deck:".bold());
        for card in session.sorted_hand() {
            println!("\t{}", paint_card(card));
        }
    }

    fn show_notice(&mut self, notice: &Notice) {
        match notice {
            Notice::Joined { lobby_id } => println!("{} Joined lobby {}!", "✔".green(), lobby_id.clone().bold()),
            Notice::PlayerJoined(name) => println!("{}", format!("{} has joined the lobby!", name).green()),
            Notice::PlayerLeft(name) => println!("{}", format!("{} has left the lobby!", name).red()),
            Notice::TopCardChanged(card) => println!("{}{}", "Top Card: ".green(), paint_card(card)),
            Notice::ClearingCards => println!("Clearing cards..."),
            Notice::PlayRejected(card) => {
                println!("{}", format!("{} can't be played right now.", card.label()).yellow())
            }
            Notice::RoundEnded => println!("{}", "The round has ended.".bold()),
            Notice::Disconnected => println!("{}", "Disconnected from the server.".red()),
        }
    }
}

impl Prompter for Terminal {
    async fn choose_turn(&mut self, session: &Session, options: &[TurnOption]) -> Result<usize, PromptError> {
        execute!(io::stdout(), Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        let top = session
            .top_card
            .as_ref()
            .map(|card| paint_card(card).bold().to_string())
            .unwrap_or_else(|| "-".to_string());
        let message = format!("What card do you want to play? (Top Card: {})", top);
        let items: Vec<StyledContent<String>> = options
            .iter()
            .map(|option| match option {
                TurnOption::Play(card) => paint_card(card),
                TurnOption::Draw { .. } => option.label().stylize(),
            })
            .collect();
        blocking(move || select(&message, &items)).await
    }

    async fn choose_wish_color(&mut self, colors: &[Color]) -> Result<usize, PromptError> {
        let items: Vec<StyledContent<String>> =
            colors.iter().map(|color| paint(color.name().to_string(), color).bold()).collect();
        blocking(move || select("What color do you want?", &items)).await
    }

    async fn confirm_start(&mut self) -> Result<(), PromptError> {
        println!("{} {}", "?".green().bold(), "Press enter to start the game!".bold());
        blocking(read_line).await?;
        Ok(())
    }
}

/// 终端读写是阻塞的，放到阻塞线程池执行
async fn blocking<T, F>(f: F) -> Result<T, PromptError>
where
    F: FnOnce() -> Result<T, PromptError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(io::Error::other)?
}

fn read_line() -> Result<String, PromptError> {
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err(PromptError::Interrupted);
    }
    Ok(line)
}

/// 离开作用域时恢复终端模式
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<RawMode> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn draw(out: &mut impl Write, items: &[StyledContent<String>], selected: usize) -> io::Result<()> {
    for (i, item) in items.iter().enumerate() {
        queue!(out, Clear(ClearType::CurrentLine))?;
        if i == selected {
            queue!(out, Print("❯ ".cyan().bold()), Print(item), Print("\r\n"))?;
        } else {
            queue!(out, Print("  "), Print(item), Print("\r\n"))?;
        }
    }
    out.flush()
}

/// 方向键（或 j/k）移动，回车确认，Ctrl-C / Esc 中断
fn select(message: &str, items: &[StyledContent<String>]) -> Result<usize, PromptError> {
    if items.is_empty() {
        return Err(PromptError::InvalidChoice(0));
    }
    let mut out = io::stdout();
    println!("{} {}", "?".green().bold(), message.bold());

    let _raw = RawMode::enable()?;
    let mut selected = 0;
    draw(&mut out, items, selected)?;
    loop {
        let key = match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => key,
            _ => continue,
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => selected = (selected + items.len() - 1) % items.len(),
            KeyCode::Down | KeyCode::Char('j') => selected = (selected + 1) % items.len(),
            KeyCode::Enter => return Ok(selected),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(PromptError::Interrupted);
            }
            KeyCode::Esc => return Err(PromptError::Interrupted),
            _ => continue,
        }
        queue!(out, MoveUp(items.len() as u16))?;
        draw(&mut out, items, selected)?;
    }
}
