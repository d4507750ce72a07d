use super::error::ParseError;
use super::moves::{fen, has_move_material};
use super::types::MoveList;
use pgn_reader::{Nag, RawComment, Reader, SanPlus, Skip, Visitor};
use shakmaty::{Chess, Position};
use std::io;
use std::ops::ControlFlow;

#[macro_export]
macro_rules! pgn_visitor_skip_side_lines {
    () => {
        fn nag(&mut self, _: &mut Self::Movetext, _: Nag) -> ControlFlow<Self::Output> {
            ControlFlow::Continue(())
        }

        fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
            ControlFlow::Continue(Skip(true))
        }
    };
}

/// Collects a comment the reader delivers in pieces. Pieces are kept raw
/// so a token spanning a piece boundary survives intact.
#[derive(Debug, Default)]
struct CommentBuffer(String);

impl CommentBuffer {
    fn push_partial(&mut self, piece: RawComment<'_>) {
        self.0.push_str(&String::from_utf8_lossy(piece.as_bytes()));
    }

    /// The whole comment, trimmed. Leaves the buffer empty.
    fn finish(&mut self, last: RawComment<'_>) -> String {
        self.push_partial(last);
        let text = self.0.trim().to_string();
        self.0.clear();
        text
    }
}

/// A comment and the position it is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionComment {
    pub fen: String,
    pub text: String,
}

/// Main line accepted by the rules engine.
#[derive(Debug, Clone, Default)]
pub struct StrictGame {
    pub moves: MoveList,
    /// Position after each ply, parallel to `moves`.
    pub fens: Vec<String>,
    pub comments: Vec<PositionComment>,
}

pub struct StrictMovetext {
    pos: Chess,
    game: StrictGame,
    pending: CommentBuffer,
}

/// Plays every main-line SAN through shakmaty and stops at the first
/// illegal move. Comments are keyed by the position they follow.
#[derive(Default)]
pub struct StrictVisitor;

impl Visitor for StrictVisitor {
    type Tags = ();
    type Movetext = StrictMovetext;
    type Output = Result<StrictGame, ParseError>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(StrictMovetext {
            pos: Chess::default(),
            game: StrictGame::default(),
            pending: CommentBuffer::default(),
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        let ply = movetext.game.moves.len() + 1;
        match san_plus.san.to_move(&movetext.pos) {
            Ok(m) => {
                movetext.pos.play_unchecked(m);
                movetext.game.moves.push(san_plus.to_string());
                movetext.game.fens.push(fen(&movetext.pos));
                ControlFlow::Continue(())
            }
            Err(_) => ControlFlow::Break(Err(ParseError::IllegalMove {
                san: san_plus.to_string(),
                ply,
            })),
        }
    }

    fn partial_comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        movetext.pending.push_partial(comment);
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        let fen = movetext
            .game
            .fens
            .last()
            .cloned()
            .unwrap_or_else(|| fen(&movetext.pos));
        movetext.game.comments.push(PositionComment {
            fen,
            text: movetext.pending.finish(comment),
        });
        ControlFlow::Continue(())
    }

    crate::pgn_visitor_skip_side_lines!();

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        Ok(movetext.game)
    }
}

/// Main line read for syntax only.
#[derive(Debug, Clone, Default)]
pub struct MainlineGame {
    pub moves: MoveList,
    /// Comments following each ply, joined, parallel to `moves`.
    pub comments: Vec<String>,
}

pub struct MainlineMovetext {
    game: MainlineGame,
    pending: CommentBuffer,
}

/// Walks the main line without a rules engine; each comment belongs to the
/// SAN before it. Comments ahead of the first move are dropped.
#[derive(Default)]
pub struct MainlineVisitor;

impl Visitor for MainlineVisitor {
    type Tags = ();
    type Movetext = MainlineMovetext;
    type Output = MainlineGame;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(MainlineMovetext {
            game: MainlineGame::default(),
            pending: CommentBuffer::default(),
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        movetext.game.moves.push(san_plus.to_string());
        movetext.game.comments.push(String::new());
        ControlFlow::Continue(())
    }

    fn partial_comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        movetext.pending.push_partial(comment);
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        let text = movetext.pending.finish(comment);
        if let Some(slot) = movetext.game.comments.last_mut() {
            if !slot.is_empty() {
                slot.push(' ');
            }
            slot.push_str(&text);
        }
        ControlFlow::Continue(())
    }

    crate::pgn_visitor_skip_side_lines!();

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        movetext.game
    }
}

/// First game of `pgn` through the rules engine.
pub fn parse_strict(pgn: &str) -> Result<StrictGame, ParseError> {
    let mut reader = Reader::new(io::Cursor::new(pgn.as_bytes()));
    let game = match reader.read_game(&mut StrictVisitor) {
        Ok(Some(result)) => result?,
        Ok(None) => return Err(ParseError::NoGame),
        Err(e) => return Err(ParseError::Read(e.to_string())),
    };

    if game.moves.is_empty() && has_move_material(pgn) {
        return Err(ParseError::NoMoves);
    }
    Ok(game)
}

/// First game of `pgn`, syntax only.
pub fn parse_mainline(pgn: &str) -> Result<MainlineGame, ParseError> {
    let mut reader = Reader::new(io::Cursor::new(pgn.as_bytes()));
    let game = match reader.read_game(&mut MainlineVisitor) {
        Ok(Some(game)) => game,
        Ok(None) => return Err(ParseError::NoGame),
        Err(e) => return Err(ParseError::Read(e.to_string())),
    };

    if game.moves.is_empty() && has_move_material(pgn) {
        return Err(ParseError::NoMoves);
    }
    Ok(game)
}
