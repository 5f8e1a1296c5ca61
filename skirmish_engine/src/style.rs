//! Styling helpers for terminal output.
//!
//! [`TableStyle`] applies ANSI styling via the `colored` crate. It is implemented
//! for `&str` and `String` so literals can be styled directly.

use colored::{ColoredString, Colorize};

pub trait TableStyle {
    fn token_style(&self) -> ColoredString;
    fn ally_style(&self) -> ColoredString;
    fn enemy_style(&self) -> ColoredString;
    fn coord_style(&self) -> ColoredString;
    fn heading_style(&self) -> ColoredString;
    fn suggestion_style(&self) -> ColoredString;
    fn info_style(&self) -> ColoredString;
    fn warning_style(&self) -> ColoredString;
    fn error_style(&self) -> ColoredString;
    fn section_style(&self) -> ColoredString;
    /// Color by faction: allies green, enemies red, everyone else plain token style.
    fn faction_style(&self, faction: &str) -> ColoredString;
}

impl TableStyle for &str {
    fn token_style(&self) -> ColoredString {
        self.truecolor(220, 180, 40)
    }
    fn ally_style(&self) -> ColoredString {
        self.truecolor(13, 170, 60).bold()
    }
    fn enemy_style(&self) -> ColoredString {
        self.truecolor(210, 50, 50).bold()
    }
    fn coord_style(&self) -> ColoredString {
        self.truecolor(102, 208, 250)
    }
    fn heading_style(&self) -> ColoredString {
        self.truecolor(223, 77, 10).underline()
    }
    fn suggestion_style(&self) -> ColoredString {
        self.italic().truecolor(230, 230, 30)
    }
    fn info_style(&self) -> ColoredString {
        self.italic().truecolor(75, 180, 255)
    }
    fn warning_style(&self) -> ColoredString {
        self.truecolor(230, 150, 30)
    }
    fn error_style(&self) -> ColoredString {
        self.bold().truecolor(230, 30, 30)
    }
    fn section_style(&self) -> ColoredString {
        let bracketed = format!("[{self}]");
        bracketed.truecolor(75, 80, 75)
    }
    fn faction_style(&self, faction: &str) -> ColoredString {
        match faction {
            "pc" | "ally" => self.ally_style(),
            "enemy" | "npc" | "hostile" => self.enemy_style(),
            _ => self.token_style(),
        }
    }
}

impl TableStyle for String {
    fn token_style(&self) -> ColoredString {
        self.as_str().token_style()
    }
    fn ally_style(&self) -> ColoredString {
        self.as_str().ally_style()
    }
    fn enemy_style(&self) -> ColoredString {
        self.as_str().enemy_style()
    }
    fn coord_style(&self) -> ColoredString {
        self.as_str().coord_style()
    }
    fn heading_style(&self) -> ColoredString {
        self.as_str().heading_style()
    }
    fn suggestion_style(&self) -> ColoredString {
        self.as_str().suggestion_style()
    }
    fn info_style(&self) -> ColoredString {
        self.as_str().info_style()
    }
    fn warning_style(&self) -> ColoredString {
        self.as_str().warning_style()
    }
    fn error_style(&self) -> ColoredString {
        self.as_str().error_style()
    }
    fn section_style(&self) -> ColoredString {
        self.as_str().section_style()
    }
    fn faction_style(&self, faction: &str) -> ColoredString {
        self.as_str().faction_style(faction)
    }
}
