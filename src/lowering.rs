//! Control-flow lowering: rewrites structured `if`/`while`/`for` statements
//! into labels and conditional/unconditional jumps, then flattens nested
//! blocks into one linear statement list the evaluator can index with a
//! program counter.

use crate::binder::{
    BoundAssignmentExpression, BoundBinaryExpression, BoundBlockStatement,
    BoundConditionalGotoStatement, BoundExpression, BoundExpressionStatement, BoundForStatement,
    BoundIfStatement, BoundLiteralExpression, BoundStatement, BoundVariableDeclarationStatement,
    BoundVariableExpression, BoundWhileStatement, LabelSymbol, TypeSymbol, VariableSymbol,
    BINARY_ADDITION_INT_INT, BINARY_LESS_OR_EQUAL_INT_INT,
};
use crate::value::Value;

/// Lower a bound statement into a flat block free of structured control
/// flow. Unchanged subtrees are moved through untouched.
pub fn lower(statement: BoundStatement) -> BoundBlockStatement {
    let mut lowerer = Lowerer { label_count: 0 };
    let rewritten = lowerer.rewrite_statement(statement);
    flatten(rewritten)
}

struct Lowerer {
    label_count: u32,
}

impl Lowerer {
    fn generate_label(&mut self) -> LabelSymbol {
        self.label_count += 1;
        LabelSymbol::new(self.label_count)
    }

    fn rewrite_statement(&mut self, statement: BoundStatement) -> BoundStatement {
        match statement {
            BoundStatement::Block(block) => BoundStatement::Block(BoundBlockStatement {
                statements: block
                    .statements
                    .into_iter()
                    .map(|s| self.rewrite_statement(s))
                    .collect(),
            }),
            BoundStatement::If(s) => self.rewrite_if_statement(s),
            BoundStatement::While(s) => self.rewrite_while_statement(s),
            BoundStatement::For(s) => self.rewrite_for_statement(s),
            other => other,
        }
    }

    /// `if c then T`            → `gotoIfFalse c end; T; end:`
    /// `if c then T else E`     → `gotoIfFalse c else; T; goto end; else: E; end:`
    fn rewrite_if_statement(&mut self, statement: BoundIfStatement) -> BoundStatement {
        let BoundIfStatement {
            condition,
            then_statement,
            else_statement,
        } = statement;

        let block = match else_statement {
            None => {
                let end_label = self.generate_label();
                BoundBlockStatement {
                    statements: vec![
                        goto_if_false(condition, end_label),
                        *then_statement,
                        BoundStatement::Label(end_label),
                    ],
                }
            }
            Some(else_statement) => {
                let else_label = self.generate_label();
                let end_label = self.generate_label();
                BoundBlockStatement {
                    statements: vec![
                        goto_if_false(condition, else_label),
                        *then_statement,
                        BoundStatement::Goto(end_label),
                        BoundStatement::Label(else_label),
                        *else_statement,
                        BoundStatement::Label(end_label),
                    ],
                }
            }
        };

        // The branch bodies may themselves contain structured control flow.
        self.rewrite_statement(BoundStatement::Block(block))
    }

    /// `while c B` → `continue: gotoIfFalse c end; B; goto continue; end:`
    fn rewrite_while_statement(&mut self, statement: BoundWhileStatement) -> BoundStatement {
        let BoundWhileStatement { condition, body } = statement;

        let continue_label = self.generate_label();
        let end_label = self.generate_label();
        let block = BoundBlockStatement {
            statements: vec![
                BoundStatement::Label(continue_label),
                goto_if_false(condition, end_label),
                *body,
                BoundStatement::Goto(continue_label),
                BoundStatement::Label(end_label),
            ],
        };

        self.rewrite_statement(BoundStatement::Block(block))
    }

    /// `for i = lo to hi B` → `{ var i = lo; while i <= hi { B; i = i + 1 } }`,
    /// which the while rule then lowers in turn.
    fn rewrite_for_statement(&mut self, statement: BoundForStatement) -> BoundStatement {
        let BoundForStatement {
            variable,
            lower_bound,
            upper_bound,
            body,
        } = statement;

        let declaration = BoundStatement::VariableDeclaration(BoundVariableDeclarationStatement {
            variable: variable.clone(),
            initializer: lower_bound,
        });

        let condition = BoundExpression::Binary(BoundBinaryExpression {
            left: Box::new(variable_expression(variable.clone())),
            operator: &BINARY_LESS_OR_EQUAL_INT_INT,
            right: Box::new(upper_bound),
        });

        let increment = BoundStatement::Expression(BoundExpressionStatement {
            expression: BoundExpression::Assignment(BoundAssignmentExpression {
                variable: variable.clone(),
                expression: Box::new(BoundExpression::Binary(BoundBinaryExpression {
                    left: Box::new(variable_expression(variable)),
                    operator: &BINARY_ADDITION_INT_INT,
                    right: Box::new(BoundExpression::Literal(BoundLiteralExpression {
                        value: Value::Int(1),
                        ty: TypeSymbol::INT,
                    })),
                })),
            }),
        });

        let while_statement = BoundStatement::While(BoundWhileStatement {
            condition,
            body: Box::new(BoundStatement::Block(BoundBlockStatement {
                statements: vec![*body, increment],
            })),
        });

        self.rewrite_statement(BoundStatement::Block(BoundBlockStatement {
            statements: vec![declaration, while_statement],
        }))
    }
}

fn goto_if_false(condition: BoundExpression, label: LabelSymbol) -> BoundStatement {
    BoundStatement::ConditionalGoto(BoundConditionalGotoStatement {
        label,
        condition,
        jump_if: false,
    })
}

fn variable_expression(variable: VariableSymbol) -> BoundExpression {
    BoundExpression::Variable(BoundVariableExpression { variable })
}

/// Splice nested blocks depth-first into a single linear statement list,
/// so jump targets are addressable by a flat program-counter index.
fn flatten(statement: BoundStatement) -> BoundBlockStatement {
    let mut statements = Vec::new();
    splice(statement, &mut statements);
    BoundBlockStatement { statements }
}

fn splice(statement: BoundStatement, out: &mut Vec<BoundStatement>) {
    if let BoundStatement::Block(block) = statement {
        for statement in block.statements {
            splice(statement, out);
        }
    } else {
        out.push(statement);
    }
}
