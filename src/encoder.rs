use itertools::Itertools;
use strum::VariantArray;

use crate::board::{Board, EdgeKey};
use crate::cell::Cell;
use crate::color::{components, derive, negate, Color};
use crate::location::Location;
use crate::logic::{and, atom, equiv, exactly_one, implies, not, or, Formula, SatEngine};

/// The named boolean variables of a puzzle theory.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Atom {
    /// `edge` carries `color`, or no color at all when `color` is [`None`].
    EdgeColor { edge: EdgeKey, color: Option<Color> },
    /// `edge` belongs to the path leaving the Start cell at `root`.
    EdgeRoot { edge: EdgeKey, root: Location },
    /// `cell` shows `color`.
    CellColor { cell: Location, color: Color },
    /// `cell` is an inverter.
    CellInvert { cell: Location },
}

pub type Theory = SatEngine<Atom>;

type F = Formula<Atom>;

fn edge_color(edge: EdgeKey, color: Color) -> F {
    atom(Atom::EdgeColor { edge, color: Some(color) })
}

fn edge_blank(edge: EdgeKey) -> F {
    atom(Atom::EdgeColor { edge, color: None })
}

pub(crate) fn edge_root(edge: EdgeKey, root: Location) -> F {
    atom(Atom::EdgeRoot { edge, root })
}

fn cell_color(cell: Location, color: Color) -> F {
    atom(Atom::CellColor { cell, color })
}

fn cell_invert(cell: Location) -> F {
    atom(Atom::CellInvert { cell })
}

/// Colors an edge is allowed to carry.
fn edge_palette() -> impl Iterator<Item = Color> {
    Color::VARIANTS.iter().copied().filter(|color| *color != Color::Black)
}

/// Translates the rules of a board into clauses.
///
/// # Logical setup
/// Every edge carries exactly one of the eight colors or no color. A colored edge has exactly one root, the Start cell whose path it is on;
/// an uncolored edge has none.
///
/// ## Terminals
/// A terminal shows its own color and no other. Exactly one incident edge is colored, in that color.
/// A Start cell roots that edge. An End cell's edge must be rooted somewhere, and the cell across it must show the color, one of its components, or invert.
///
/// ## Inverters
/// An inverter shows no color. Each incident edge colored C is matched by another incident edge colored the negation of C, on the same root.
///
/// ## Empty cells
/// An empty cell shows exactly one color, which is carried by at least two incident edges.
/// Every colored edge entering it leaves as the color it derives to against the cell color, or splits into its components.
///
/// ## Pairing
/// Colored edges at a cell come in pairs: a cell of degree 3 has exactly one uncolored edge, and a cell of degree 4 has either none or at least two.
///
/// Nothing here rules out a path closing on itself; see [`GraphSolver`](crate::solver::GraphSolver).
pub(crate) struct Encoder<'b> {
    board: &'b Board,
    roots: Vec<Location>,
}

impl<'b> Encoder<'b> {
    pub(crate) fn new(board: &'b Board) -> Self {
        Self {
            board,
            roots: board.starts(),
        }
    }

    /// Emit the whole theory for this board into `theory`.
    pub(crate) fn encode(&self, theory: &mut Theory) {
        self.terminal_clauses(theory);
        self.inverter_clauses(theory);
        self.empty_cell_clauses(theory);
        self.edge_clauses(theory);
    }

    // some root, and only one, claims this edge
    fn some_root(&self, edge: EdgeKey) -> F {
        exactly_one(self.roots.iter().map(|root| edge_root(edge, *root)))
    }

    fn terminal_clauses(&self, theory: &mut Theory) {
        for node in self.board.nodes() {
            let (color, is_start) = match node.cell {
                Cell::Start { color } => (color, true),
                Cell::End { color } => (color, false),
                _ => continue,
            };
            let cell = node.location;
            let incident = self.board.incident_edges(cell);

            theory.forbid(cell_invert(cell));
            theory.require(cell_color(cell, color));
            for other in Color::VARIANTS.iter().filter(|other| **other != color) {
                theory.forbid(cell_color(cell, *other));
            }

            // exactly one way out, in this color
            theory.require(exactly_one(incident.iter().map(|edge| edge_color(*edge, color))));

            for edge in &incident {
                // the way out is the only colored edge
                theory.require(equiv(
                    edge_color(*edge, color),
                    and(incident.iter().filter(|other| *other != edge).map(|other| edge_blank(*other))),
                ));

                if is_start {
                    theory.require(equiv(edge_color(*edge, color), edge_root(*edge, cell)));
                } else {
                    let neighbor = edge.other(cell);
                    let mut accepted = vec![cell_color(neighbor, color), cell_invert(neighbor)];
                    accepted.extend(components(color).iter().map(|part| cell_color(neighbor, *part)));
                    theory.require(implies(edge_color(*edge, color), or(accepted)));

                    // arriving paths come from somewhere; an End cannot feed itself
                    theory.require(equiv(edge_color(*edge, color), self.some_root(*edge)));
                }
            }
        }
    }

    fn inverter_clauses(&self, theory: &mut Theory) {
        for node in self.board.nodes().filter(|node| node.cell == Cell::Inverter) {
            let cell = node.location;
            let incident = self.board.incident_edges(cell);

            theory.require(cell_invert(cell));
            for color in Color::VARIANTS {
                theory.forbid(cell_color(cell, *color));
            }

            for edge in &incident {
                for color in Color::VARIANTS {
                    theory.require(implies(
                        edge_color(*edge, *color),
                        or(incident.iter()
                            .filter(|other| *other != edge)
                            .map(|other| edge_color(*other, negate(*color)))),
                    ));
                }
            }

            // something passes through
            theory.require(or(Color::VARIANTS.iter()
                .cartesian_product(incident.iter())
                .map(|(color, edge)| edge_color(*edge, *color))));

            self.pairing_clauses(theory, &incident);
        }
    }

    fn empty_cell_clauses(&self, theory: &mut Theory) {
        for node in self.board.nodes().filter(|node| node.cell == Cell::Empty) {
            let cell = node.location;
            let incident = self.board.incident_edges(cell);

            theory.forbid(cell_invert(cell));
            theory.require(exactly_one(Color::VARIANTS.iter().map(|color| cell_color(cell, *color))));

            for color in Color::VARIANTS {
                // every choice of all but one incident edge contains one of this color,
                // i.e. at least two incident edges have it
                theory.require(equiv(
                    cell_color(cell, *color),
                    and(incident.iter()
                        .combinations(incident.len().saturating_sub(1))
                        .map(|subset| or(subset.into_iter().map(|edge| edge_color(*edge, *color))))),
                ));
            }

            self.pairing_clauses(theory, &incident);
        }
    }

    fn pairing_clauses(&self, theory: &mut Theory, edges: &[EdgeKey]) {
        match edges.len() {
            3 => theory.require(exactly_one(edges.iter().map(|edge| edge_blank(*edge)))),
            4 => theory.require(or([
                // a crossing
                and(edges.iter().map(|edge| not(edge_blank(*edge)))),
                // or at most two colored
                and(edges.iter()
                    .combinations(3)
                    .map(|triple| or(triple.into_iter().map(|edge| edge_blank(*edge))))),
            ])),
            _ => {}
        }
    }

    fn edge_clauses(&self, theory: &mut Theory) {
        for edge in self.board.edges() {
            let mut choices = Color::VARIANTS.iter().map(|color| edge_color(edge, *color)).collect_vec();
            choices.push(edge_blank(edge));
            theory.require(exactly_one(choices));
            theory.forbid(edge_color(edge, Color::Black));

            // colored iff rooted, and an uncolored edge has no root at all
            theory.require(equiv(not(edge_blank(edge)), self.some_root(edge)));
            for root in &self.roots {
                theory.forbid(and([edge_blank(edge), edge_root(edge, *root)]));
            }

            let (low, high) = edge.endpoints();
            // black is forbidden above, which makes every implication below vacuous for it
            for color in edge_palette() {
                for cell in [low, high] {
                    let others = self.board.incident_edges(cell)
                        .into_iter()
                        .filter(|other| *other != edge)
                        .collect_vec();

                    match self.board.cell_at(cell) {
                        Some(Cell::Inverter) => self.inverted_edge_clauses(theory, edge, color, &others),
                        Some(Cell::Empty) => self.mixed_edge_clauses(theory, edge, color, cell, &others),
                        // terminals are fully handled by their own clauses
                        _ => {}
                    }
                }

                // at least one endpoint accounts for the color directly
                let explanations = [low, high].map(|cell| {
                    let mut options = vec![cell_color(cell, color), cell_invert(cell)];
                    options.extend(components(color).iter().map(|part| cell_color(cell, *part)));
                    exactly_one(options)
                });
                theory.require(implies(edge_color(edge, color), or(explanations)));
            }
        }
    }

    // `edge` enters an inverter colored `color`
    fn inverted_edge_clauses(&self, theory: &mut Theory, edge: EdgeKey, color: Color, others: &[EdgeKey]) {
        let inverse = negate(color);

        theory.require(implies(
            edge_color(edge, color),
            or(others.iter().map(|other| edge_color(*other, inverse))),
        ));

        for root in &self.roots {
            theory.require(implies(
                and([edge_root(edge, *root), edge_color(edge, color)]),
                exactly_one(others.iter().map(|other| and([edge_root(*other, *root), edge_color(*other, inverse)]))),
            ));
        }
    }

    // `edge` enters the empty cell `cell` colored `color`
    fn mixed_edge_clauses(&self, theory: &mut Theory, edge: EdgeKey, color: Color, cell: Location, others: &[EdgeKey]) {
        let parts = components(color);

        // leaving through `via` as one component, with the remaining components leaving elsewhere
        let split_through = |via: EdgeKey| -> Vec<F> {
            let mut splits = Vec::with_capacity(parts.len());
            for part in parts {
                let mut rest = Vec::new();
                for other_part in parts.iter().filter(|p| *p != part) {
                    for other in others.iter().filter(|other| **other != via) {
                        rest.push(edge_color(*other, *other_part));
                    }
                }
                splits.push(and([edge_color(via, *part), or(rest)]));
            }
            splits
        };

        let mut per_shown = Vec::with_capacity(Color::VARIANTS.len());
        for shown in Color::VARIANTS {
            let mut exits = Vec::with_capacity(others.len());
            for via in others {
                let mut ways = split_through(*via);
                ways.push(edge_color(*via, derive(color, *shown)));
                exits.push(or(ways));
            }
            per_shown.push(implies(cell_color(cell, *shown), or(exits)));
        }
        theory.require(implies(edge_color(edge, color), and(per_shown)));

        // the path continues through exactly one other edge on the same root
        for root in &self.roots {
            let mut continuations = Vec::with_capacity(others.len());
            for via in others {
                let derived = and(Color::VARIANTS.iter()
                    .map(|shown| implies(cell_color(cell, *shown), edge_color(*via, derive(color, *shown)))));
                let mut ways = vec![derived];
                ways.extend(parts.iter().map(|part| edge_color(*via, *part)));
                continuations.push(and([edge_root(*via, *root), or(ways)]));
            }

            theory.require(implies(
                and([edge_root(edge, *root), edge_color(edge, color)]),
                exactly_one(continuations),
            ));
        }
    }
}
