//! Bytecode interpretation under resource limits.
//!
//! The interpreter executes the stack-machine subset that entry routines in
//! practice consist of: integer arithmetic and comparisons, local variable
//! traffic, constant loading, conditional and unconditional branches, object
//! construction for throwables, and calls. Calls resolve in three tiers -
//! the published sink class (stream writes, recorded termination), static
//! methods of classes defined in the namespace (run on frames of their own),
//! and everything else, which fails as an undefined reference.
//!
//! Guest calls push [`Frame`]s onto an explicit, heap-allocated stack inside
//! the dispatch loop; guest recursion therefore never consumes host stack,
//! and a runaway guest is cut off by the depth ceiling instead of crashing
//! the process.
//!
//! Execution is bounded three ways: an instruction budget, a call depth
//! ceiling and an optional wall-clock deadline. Guest failures surface as
//! [`crate::Error::Thrown`]; limit violations as [`crate::Error::Timeout`]
//! or [`crate::Error::RecursionLimit`]. The interpreter never panics on
//! hostile bytecode - malformed operands become errors.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    sandbox::{
        capture::CaptureSink,
        loader::{LoadedClass, MethodInfo, RuntimeConstant},
        namespace::Namespace,
    },
    Result,
};

/// Resource bounds for one sandboxed invocation.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use classpatch::sandbox::ExecutionLimits;
///
/// let limits = ExecutionLimits {
///     max_instructions: 50_000,
///     timeout: Some(Duration::from_millis(100)),
///     ..ExecutionLimits::default()
/// };
/// assert_eq!(limits.max_call_depth, 128);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Total instructions across all frames before the run is cut off
    pub max_instructions: u64,
    /// Maximum nesting of guest method calls
    pub max_call_depth: usize,
    /// Optional wall-clock deadline for the whole run
    pub timeout: Option<Duration>,
}

impl Default for ExecutionLimits {
    fn default() -> ExecutionLimits {
        ExecutionLimits {
            max_instructions: 10_000_000,
            max_call_depth: 128,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamKind {
    Out,
    Err,
}

#[derive(Debug)]
pub(crate) struct Instance {
    pub(crate) class: String,
    pub(crate) message: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) enum Value {
    Null,
    Int(i32),
    Str(String),
    Stream(StreamKind),
    Object(Rc<RefCell<Instance>>),
}

pub(crate) struct Interpreter<'a> {
    namespace: &'a Namespace,
    sink: &'a mut CaptureSink,
    limits: ExecutionLimits,
    executed: u64,
    deadline: Option<Instant>,
}

// Deadline polling interval, in instructions
const DEADLINE_STRIDE: u64 = 1024;

/// One guest call frame: the method's bytecode plus its locals, operand
/// stack and program counter. Frames live on a heap-allocated stack owned
/// by the dispatch loop, never on the host call stack.
struct Frame {
    class: Arc<LoadedClass>,
    bytecode: Vec<u8>,
    locals: Vec<Value>,
    stack: Vec<Value>,
    pc: usize,
}

impl Frame {
    fn new(class: Arc<LoadedClass>, method: &MethodInfo, args: Vec<Value>) -> Result<Frame> {
        let Some(code) = method.code.as_ref() else {
            return Err(crate::Error::Unsupported(format!(
                "Method {}.{} has no body",
                class.name(),
                method.name
            )));
        };

        let slots = usize::from(code.max_locals).max(args.len());
        let mut locals = args;
        locals.resize(slots, Value::Null);
        let stack = Vec::with_capacity(usize::from(code.max_stack));
        let bytecode = code.bytecode.clone();

        Ok(Frame { class, bytecode, locals, stack, pc: 0 })
    }
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(
        namespace: &'a Namespace,
        sink: &'a mut CaptureSink,
        limits: ExecutionLimits,
    ) -> Interpreter<'a> {
        let deadline = limits.timeout.map(|timeout| Instant::now() + timeout);
        Interpreter { namespace, sink, limits, executed: 0, deadline }
    }

    /// Execute a method to completion; returns the value it produced, if any.
    ///
    /// Guest calls push new frames instead of re-entering this function, so
    /// the host stack stays flat no matter how deeply the guest recurses.
    pub(crate) fn run(
        &mut self,
        class: Arc<LoadedClass>,
        method: &MethodInfo,
        args: Vec<Value>,
    ) -> Result<Option<Value>> {
        let mut frames = vec![Frame::new(class, method, args)?];

        loop {
            self.executed += 1;
            if self.executed > self.limits.max_instructions {
                return Err(crate::Error::Timeout);
            }
            if self.executed % DEADLINE_STRIDE == 0 {
                if let Some(deadline) = self.deadline {
                    if Instant::now() >= deadline {
                        return Err(crate::Error::Timeout);
                    }
                }
            }

            let Some(frame) = frames.last_mut() else {
                return Err(malformed_error!("Dispatch loop ran out of frames"));
            };
            let pc = frame.pc;

            let op = fetch_u8(&frame.bytecode, pc)?;
            match op {
                // nop
                0x00 => frame.pc += 1,
                // aconst_null
                0x01 => {
                    frame.stack.push(Value::Null);
                    frame.pc += 1;
                }
                // iconst_m1 .. iconst_5
                0x02..=0x08 => {
                    frame.stack.push(Value::Int(i32::from(op) - 3));
                    frame.pc += 1;
                }
                // bipush
                0x10 => {
                    let byte = fetch_u8(&frame.bytecode, pc + 1)? as i8;
                    frame.stack.push(Value::Int(i32::from(byte)));
                    frame.pc += 2;
                }
                // sipush
                0x11 => {
                    let word = fetch_u16(&frame.bytecode, pc + 1)? as i16;
                    frame.stack.push(Value::Int(i32::from(word)));
                    frame.pc += 3;
                }
                // ldc
                0x12 => {
                    let index = u16::from(fetch_u8(&frame.bytecode, pc + 1)?);
                    let value = self.load_constant(&frame.class, index)?;
                    frame.stack.push(value);
                    frame.pc += 2;
                }
                // ldc_w
                0x13 => {
                    let index = fetch_u16(&frame.bytecode, pc + 1)?;
                    let value = self.load_constant(&frame.class, index)?;
                    frame.stack.push(value);
                    frame.pc += 3;
                }
                // iload, aload
                0x15 | 0x19 => {
                    let slot = usize::from(fetch_u8(&frame.bytecode, pc + 1)?);
                    let value = load_local(&frame.locals, slot, pc)?;
                    frame.stack.push(value);
                    frame.pc += 2;
                }
                // iload_0 .. iload_3
                0x1A..=0x1D => {
                    let value = load_local(&frame.locals, usize::from(op - 0x1A), pc)?;
                    frame.stack.push(value);
                    frame.pc += 1;
                }
                // aload_0 .. aload_3
                0x2A..=0x2D => {
                    let value = load_local(&frame.locals, usize::from(op - 0x2A), pc)?;
                    frame.stack.push(value);
                    frame.pc += 1;
                }
                // istore, astore
                0x36 | 0x3A => {
                    let slot = usize::from(fetch_u8(&frame.bytecode, pc + 1)?);
                    let value = pop(&mut frame.stack, pc)?;
                    store_local(&mut frame.locals, slot, value, pc)?;
                    frame.pc += 2;
                }
                // istore_0 .. istore_3
                0x3B..=0x3E => {
                    let value = pop(&mut frame.stack, pc)?;
                    store_local(&mut frame.locals, usize::from(op - 0x3B), value, pc)?;
                    frame.pc += 1;
                }
                // astore_0 .. astore_3
                0x4B..=0x4E => {
                    let value = pop(&mut frame.stack, pc)?;
                    store_local(&mut frame.locals, usize::from(op - 0x4B), value, pc)?;
                    frame.pc += 1;
                }
                // pop
                0x57 => {
                    pop(&mut frame.stack, pc)?;
                    frame.pc += 1;
                }
                // dup
                0x59 => {
                    let top = pop(&mut frame.stack, pc)?;
                    frame.stack.push(top.clone());
                    frame.stack.push(top);
                    frame.pc += 1;
                }
                // iadd, isub, imul
                0x60 | 0x64 | 0x68 => {
                    let rhs = pop_int(&mut frame.stack, pc)?;
                    let lhs = pop_int(&mut frame.stack, pc)?;
                    let result = match op {
                        0x60 => lhs.wrapping_add(rhs),
                        0x64 => lhs.wrapping_sub(rhs),
                        _ => lhs.wrapping_mul(rhs),
                    };
                    frame.stack.push(Value::Int(result));
                    frame.pc += 1;
                }
                // idiv, irem
                0x6C | 0x70 => {
                    let rhs = pop_int(&mut frame.stack, pc)?;
                    let lhs = pop_int(&mut frame.stack, pc)?;
                    if rhs == 0 {
                        return Err(crate::Error::Thrown {
                            class: "java/lang/ArithmeticException".to_string(),
                            message: Some("/ by zero".to_string()),
                        });
                    }
                    let result = if op == 0x6C {
                        lhs.wrapping_div(rhs)
                    } else {
                        lhs.wrapping_rem(rhs)
                    };
                    frame.stack.push(Value::Int(result));
                    frame.pc += 1;
                }
                // iinc
                0x84 => {
                    let slot = usize::from(fetch_u8(&frame.bytecode, pc + 1)?);
                    let delta = i32::from(fetch_u8(&frame.bytecode, pc + 2)? as i8);
                    match load_local(&frame.locals, slot, pc)? {
                        Value::Int(value) => {
                            store_local(&mut frame.locals, slot, Value::Int(value.wrapping_add(delta)), pc)?;
                        }
                        _ => return Err(malformed_error!("iinc on non-integer local {} at pc {}", slot, pc)),
                    }
                    frame.pc += 3;
                }
                // ifeq .. ifle
                0x99..=0x9E => {
                    let value = pop_int(&mut frame.stack, pc)?;
                    let taken = match op {
                        0x99 => value == 0,
                        0x9A => value != 0,
                        0x9B => value < 0,
                        0x9C => value >= 0,
                        0x9D => value > 0,
                        _ => value <= 0,
                    };
                    frame.pc = branch(&frame.bytecode, pc, taken)?;
                }
                // if_icmpeq .. if_icmple
                0x9F..=0xA4 => {
                    let rhs = pop_int(&mut frame.stack, pc)?;
                    let lhs = pop_int(&mut frame.stack, pc)?;
                    let taken = match op {
                        0x9F => lhs == rhs,
                        0xA0 => lhs != rhs,
                        0xA1 => lhs < rhs,
                        0xA2 => lhs >= rhs,
                        0xA3 => lhs > rhs,
                        _ => lhs <= rhs,
                    };
                    frame.pc = branch(&frame.bytecode, pc, taken)?;
                }
                // goto
                0xA7 => frame.pc = branch(&frame.bytecode, pc, true)?,
                // ireturn, areturn
                0xAC | 0xB0 => {
                    let value = pop(&mut frame.stack, pc)?;
                    frames.pop();
                    match frames.last_mut() {
                        Some(caller) => caller.stack.push(value),
                        None => return Ok(Some(value)),
                    }
                }
                // return
                0xB1 => {
                    frames.pop();
                    if frames.is_empty() {
                        return Ok(None);
                    }
                }
                // getstatic
                0xB2 => {
                    let index = fetch_u16(&frame.bytecode, pc + 1)?;
                    let value = self.get_static(&frame.class, index)?;
                    frame.stack.push(value);
                    frame.pc += 3;
                }
                // invokevirtual
                0xB6 => {
                    let index = fetch_u16(&frame.bytecode, pc + 1)?;
                    self.invoke_virtual(&frame.class, index, &mut frame.stack, pc)?;
                    frame.pc += 3;
                }
                // invokespecial
                0xB7 => {
                    let index = fetch_u16(&frame.bytecode, pc + 1)?;
                    self.invoke_special(&frame.class, index, &mut frame.stack, pc)?;
                    frame.pc += 3;
                }
                // invokestatic
                0xB8 => {
                    let index = fetch_u16(&frame.bytecode, pc + 1)?;
                    let callee = self.invoke_static(&frame.class, index, &mut frame.stack, pc)?;
                    // The caller resumes past the call once the callee returns
                    frame.pc += 3;
                    if let Some(callee) = callee {
                        if frames.len() > self.limits.max_call_depth {
                            return Err(crate::Error::RecursionLimit(self.limits.max_call_depth));
                        }
                        frames.push(callee);
                    }
                }
                // new
                0xBB => {
                    let index = fetch_u16(&frame.bytecode, pc + 1)?;
                    let name = frame.class.pool().class_name(index)?.to_string();
                    frame.stack.push(Value::Object(Rc::new(RefCell::new(Instance {
                        class: name,
                        message: None,
                    }))));
                    frame.pc += 3;
                }
                // athrow
                0xBF => {
                    return match pop(&mut frame.stack, pc)? {
                        Value::Object(instance) => {
                            let instance = instance.borrow();
                            Err(crate::Error::Thrown {
                                class: instance.class.clone(),
                                message: instance.message.clone(),
                            })
                        }
                        Value::Null => Err(crate::Error::Thrown {
                            class: "java/lang/NullPointerException".to_string(),
                            message: None,
                        }),
                        _ => Err(malformed_error!("athrow on a non-reference at pc {}", pc)),
                    };
                }
                _ => {
                    return Err(crate::Error::Unsupported(format!(
                        "Opcode 0x{op:02X} at pc {pc}"
                    )))
                }
            }
        }
    }

    fn load_constant(&self, class: &LoadedClass, index: u16) -> Result<Value> {
        Ok(match class.constant(index)? {
            RuntimeConstant::Int(value) => Value::Int(value),
            RuntimeConstant::Str(text) => Value::Str(text.to_string()),
        })
    }

    fn get_static(&self, class: &LoadedClass, index: u16) -> Result<Value> {
        let (owner, name, _descriptor) = class.pool().member_ref(index)?;
        if self.namespace.is_sink(owner) {
            return match name {
                "out" => Ok(Value::Stream(StreamKind::Out)),
                "err" => Ok(Value::Stream(StreamKind::Err)),
                _ => Err(crate::Error::Unsupported(format!(
                    "Static field {owner}.{name}"
                ))),
            };
        }
        Err(crate::Error::ClassNotFound(owner.to_string()))
    }

    fn invoke_virtual(
        &mut self,
        class: &LoadedClass,
        index: u16,
        stack: &mut Vec<Value>,
        pc: usize,
    ) -> Result<()> {
        let (owner, name, descriptor) = class.pool().member_ref(index)?;
        let mut args = pop_args(stack, descriptor, pc)?;
        let receiver = pop(stack, pc)?;

        match receiver {
            Value::Stream(_) => self.dispatch_stream(owner, name, descriptor, args),
            Value::Object(instance) => match (name, descriptor) {
                ("getMessage", "()Ljava/lang/String;") => {
                    let message = instance.borrow().message.clone();
                    stack.push(message.map_or(Value::Null, Value::Str));
                    Ok(())
                }
                _ => Err(crate::Error::Unsupported(format!(
                    "Virtual call {owner}.{name}{descriptor}"
                ))),
            },
            Value::Str(text) => match (name, descriptor) {
                ("length", "()I") => {
                    stack.push(Value::Int(text.chars().count() as i32));
                    Ok(())
                }
                ("concat", "(Ljava/lang/String;)Ljava/lang/String;") => {
                    match args.pop() {
                        Some(Value::Str(suffix)) => {
                            stack.push(Value::Str(text + &suffix));
                            Ok(())
                        }
                        _ => Err(malformed_error!("concat expects a string argument at pc {}", pc)),
                    }
                }
                _ => Err(crate::Error::Unsupported(format!(
                    "Virtual call {owner}.{name}{descriptor} on a string"
                ))),
            },
            Value::Null => Err(crate::Error::Thrown {
                class: "java/lang/NullPointerException".to_string(),
                message: None,
            }),
            Value::Int(_) => Err(malformed_error!(
                "Virtual call on a primitive at pc {}",
                pc
            )),
        }
    }

    fn dispatch_stream(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        mut args: Vec<Value>,
    ) -> Result<()> {
        match (name, descriptor) {
            ("println", "(Ljava/lang/String;)V") => match args.pop() {
                Some(Value::Str(text)) => self.sink.println(&text),
                Some(Value::Null) => self.sink.println("null"),
                _ => return Err(crate::Error::Unsupported("println argument".to_string())),
            },
            ("print", "(Ljava/lang/String;)V") => match args.pop() {
                Some(Value::Str(text)) => self.sink.print(&text),
                Some(Value::Null) => self.sink.print("null"),
                _ => return Err(crate::Error::Unsupported("print argument".to_string())),
            },
            ("println", "(I)V") => self.sink.println_int(expect_int(args.pop())?),
            ("print", "(I)V") => self.sink.print_int(expect_int(args.pop())?),
            ("println", "(C)V") => {
                let c = char_arg(args.pop())?;
                self.sink.print_char(c);
                self.sink.newline();
            }
            ("print", "(C)V") => self.sink.print_char(char_arg(args.pop())?),
            ("println", "()V") => self.sink.newline(),
            ("write", "(I)V") => self.sink.write_byte(expect_int(args.pop())? as u8),
            ("flush", "()V") => self.sink.flush(),
            _ => {
                return Err(crate::Error::Unsupported(format!(
                    "Stream call {owner}.{name}{descriptor}"
                )))
            }
        }
        Ok(())
    }

    fn invoke_special(
        &mut self,
        class: &LoadedClass,
        index: u16,
        stack: &mut Vec<Value>,
        pc: usize,
    ) -> Result<()> {
        let (owner, name, descriptor) = class.pool().member_ref(index)?;
        if name != "<init>" {
            return Err(crate::Error::Unsupported(format!(
                "Special call {owner}.{name}{descriptor}"
            )));
        }

        let args = pop_args(stack, descriptor, pc)?;
        let receiver = pop(stack, pc)?;
        if let Value::Object(instance) = receiver {
            // A throwable constructor's string argument becomes the message
            if let Some(Value::Str(message)) = args.into_iter().next() {
                instance.borrow_mut().message = Some(message);
            }
            Ok(())
        } else {
            Err(malformed_error!("Constructor call on a non-object at pc {}", pc))
        }
    }

    /// Resolve a static call. Sink calls are absorbed here and yield `None`;
    /// namespace calls yield the callee's frame for the dispatch loop to
    /// push. The callee's own return instruction routes any result onto the
    /// caller's operand stack.
    fn invoke_static(
        &mut self,
        class: &LoadedClass,
        index: u16,
        stack: &mut Vec<Value>,
        pc: usize,
    ) -> Result<Option<Frame>> {
        let (owner, name, descriptor) = class.pool().member_ref(index)?;
        let (owner, name, descriptor) =
            (owner.to_string(), name.to_string(), descriptor.to_string());
        let args = pop_args(stack, &descriptor, pc)?;

        if self.namespace.is_sink(&owner) {
            if name == "exit" && descriptor == "(I)V" {
                let code = expect_int(args.into_iter().next())?;
                self.sink.exit(code);
                return Ok(None);
            }
            return Err(crate::Error::Unsupported(format!(
                "Static call {owner}.{name}{descriptor}"
            )));
        }

        let Some(callee_class) = self.namespace.get(&owner) else {
            return Err(crate::Error::ClassNotFound(owner));
        };
        let Some(callee) = callee_class.method(&name, &descriptor) else {
            return Err(crate::Error::Unsupported(format!(
                "Static call {owner}.{name}{descriptor}"
            )));
        };
        // method() hands back a borrow tied to the Arc's contents
        let callee = callee.clone();

        Frame::new(callee_class, &callee, args).map(Some)
    }
}

fn fetch_u8(code: &[u8], pc: usize) -> Result<u8> {
    code.get(pc)
        .copied()
        .ok_or_else(|| malformed_error!("Bytecode ends at pc {}", pc))
}

fn fetch_u16(code: &[u8], pc: usize) -> Result<u16> {
    Ok(u16::from_be_bytes([fetch_u8(code, pc)?, fetch_u8(code, pc + 1)?]))
}

fn branch(code: &[u8], pc: usize, taken: bool) -> Result<usize> {
    if !taken {
        return Ok(pc + 3);
    }
    let offset = fetch_u16(code, pc + 1)? as i16;
    let target = pc as isize + isize::from(offset);
    if target < 0 || target as usize >= code.len() {
        return Err(malformed_error!("Branch target {} out of bounds at pc {}", target, pc));
    }
    Ok(target as usize)
}

fn pop(stack: &mut Vec<Value>, pc: usize) -> Result<Value> {
    stack
        .pop()
        .ok_or_else(|| malformed_error!("Operand stack underflow at pc {}", pc))
}

fn pop_int(stack: &mut Vec<Value>, pc: usize) -> Result<i32> {
    match pop(stack, pc)? {
        Value::Int(value) => Ok(value),
        _ => Err(malformed_error!("Expected an integer on the stack at pc {}", pc)),
    }
}

fn load_local(locals: &[Value], slot: usize, pc: usize) -> Result<Value> {
    locals
        .get(slot)
        .cloned()
        .ok_or_else(|| malformed_error!("Local slot {} out of range at pc {}", slot, pc))
}

fn store_local(locals: &mut [Value], slot: usize, value: Value, pc: usize) -> Result<()> {
    match locals.get_mut(slot) {
        Some(local) => {
            *local = value;
            Ok(())
        }
        None => Err(malformed_error!("Local slot {} out of range at pc {}", slot, pc)),
    }
}

fn expect_int(value: Option<Value>) -> Result<i32> {
    match value {
        Some(Value::Int(value)) => Ok(value),
        _ => Err(malformed_error!("Expected an integer argument")),
    }
}

fn char_arg(value: Option<Value>) -> Result<char> {
    let code = expect_int(value)?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| malformed_error!("Invalid character code {}", code))
}

/// Pop a call's arguments in declaration order.
fn pop_args(stack: &mut Vec<Value>, descriptor: &str, pc: usize) -> Result<Vec<Value>> {
    let count = arg_count(descriptor)?;
    if stack.len() < count {
        return Err(malformed_error!("Operand stack underflow at pc {}", pc));
    }
    let mut args = stack.split_off(stack.len() - count);
    args.shrink_to_fit();
    Ok(args)
}

/// Number of declared parameters in a method descriptor.
fn arg_count(descriptor: &str) -> Result<usize> {
    let inner = descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map(|(params, _)| params)
        .ok_or_else(|| malformed_error!("Invalid method descriptor {:?}", descriptor))?;

    let mut count = 0;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' => count += 1,
            'L' => {
                if !chars.by_ref().any(|c| c == ';') {
                    return Err(malformed_error!("Invalid method descriptor {:?}", descriptor));
                }
                count += 1;
            }
            // Array dimensions do not add parameters; the element type
            // consumed on the next iterations does.
            '[' => {}
            _ => return Err(malformed_error!("Invalid method descriptor {:?}", descriptor)),
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{ClassBuilder, MethodAccess};

    fn run_main(bytes: Vec<u8>, limits: ExecutionLimits) -> (Result<Option<Value>>, String) {
        let mut namespace = Namespace::new();
        namespace.bind_sink("sandbox/Capture");
        let class = namespace.define(bytes).unwrap();
        let entry = class.entry_point().unwrap().clone();

        let mut sink = CaptureSink::new();
        let mut interp = Interpreter::new(&namespace, &mut sink, limits);
        let result = interp.run(class, &entry, vec![Value::Null]);
        (result, sink.into_string())
    }

    fn patched_hello() -> Vec<u8> {
        use crate::rewrite::{redirect, RedirectionRequest};
        let mut class = crate::ClassFile::parse(crate::test::hello_class()).unwrap();
        let request = RedirectionRequest::new("java/lang/System", "sandbox/Capture");
        redirect(&mut class, &request).unwrap();
        class.into_bytes()
    }

    #[test]
    fn prints_through_the_sink() {
        let (result, output) = run_main(patched_hello(), ExecutionLimits::default());
        assert!(matches!(result, Ok(None)));
        assert_eq!(output, "hello\n");
    }

    #[test]
    fn unpatched_reference_is_undefined() {
        let (result, output) = run_main(crate::test::hello_class(), ExecutionLimits::default());
        assert!(matches!(
            result,
            Err(crate::Error::ClassNotFound(name)) if name == "java/lang/System"
        ));
        assert!(output.is_empty());
    }

    #[test]
    fn division_by_zero_is_thrown() {
        let mut b = ClassBuilder::new("sandbox/DivZero");
        // 1 / 0
        let code = [0x04, 0x03, 0x6C, 0x57, 0xB1];
        b.method(
            MethodAccess::PUBLIC | MethodAccess::STATIC,
            "main",
            "([Ljava/lang/String;)V",
            2,
            1,
            &code,
        );

        let (result, _) = run_main(b.build(), ExecutionLimits::default());
        assert!(matches!(
            result,
            Err(crate::Error::Thrown { class, message })
                if class == "java/lang/ArithmeticException"
                    && message.as_deref() == Some("/ by zero")
        ));
    }

    #[test]
    fn loop_counts_down() {
        let mut b = ClassBuilder::new("sandbox/Loop");
        let out = b.field_ref("sandbox/Capture", "out", "Ljava/io/PrintStream;");
        let println = b.method_ref("java/io/PrintStream", "println", "(I)V");
        // for (i = 3; i > 0; i--) println(i)
        let code = [
            0x06,                                      // iconst_3
            0x3C,                                      // istore_1
            0x1B,                                      // iload_1        <- pc 2
            0x9E, 0x00, 0x10,                          // ifle +16 -> pc 19
            0xB2, (out >> 8) as u8, out as u8,         // getstatic out
            0x1B,                                      // iload_1
            0xB6, (println >> 8) as u8, println as u8, // println(I)V
            0x84, 0x01, 0xFF,                          // iinc 1, -1
            0xA7, 0xFF, 0xF2,                          // goto -14 -> pc 2
            0xB1,                                      // return         <- pc 19
        ];
        b.method(
            MethodAccess::PUBLIC | MethodAccess::STATIC,
            "main",
            "([Ljava/lang/String;)V",
            2,
            2,
            &code,
        );

        let (result, output) = run_main(b.build(), ExecutionLimits::default());
        assert!(matches!(result, Ok(None)));
        assert_eq!(output, "3\n2\n1\n");
    }

    #[test]
    fn infinite_loop_hits_instruction_budget() {
        let mut b = ClassBuilder::new("sandbox/Spin");
        let code = [0xA7, 0x00, 0x00]; // goto self
        b.method(
            MethodAccess::PUBLIC | MethodAccess::STATIC,
            "main",
            "([Ljava/lang/String;)V",
            0,
            1,
            &code,
        );

        let limits = ExecutionLimits { max_instructions: 1_000, ..ExecutionLimits::default() };
        let (result, _) = run_main(b.build(), limits);
        assert!(matches!(result, Err(crate::Error::Timeout)));
    }

    #[test]
    fn static_helper_calls_resolve_within_the_class() {
        let mut b = ClassBuilder::new("sandbox/Helper");
        let out = b.field_ref("sandbox/Capture", "out", "Ljava/io/PrintStream;");
        let println = b.method_ref("java/io/PrintStream", "println", "(I)V");
        let twice = b.method_ref("sandbox/Helper", "twice", "(I)I");

        let main_code = [
            0xB2, (out >> 8) as u8, out as u8,       // getstatic out
            0x10, 21,                                // bipush 21
            0xB8, (twice >> 8) as u8, twice as u8,   // invokestatic twice
            0xB6, (println >> 8) as u8, println as u8,
            0xB1,
        ];
        b.method(
            MethodAccess::PUBLIC | MethodAccess::STATIC,
            "main",
            "([Ljava/lang/String;)V",
            2,
            1,
            &main_code,
        );
        let twice_code = [0x1A, 0x05, 0x68, 0xAC]; // iload_0; iconst_2; imul; ireturn
        b.method(MethodAccess::PRIVATE | MethodAccess::STATIC, "twice", "(I)I", 2, 1, &twice_code);

        let (result, output) = run_main(b.build(), ExecutionLimits::default());
        assert!(matches!(result, Ok(None)));
        assert_eq!(output, "42\n");
    }

    #[test]
    fn unbounded_recursion_hits_depth_limit() {
        let mut b = ClassBuilder::new("sandbox/Rec");
        let again = b.method_ref("sandbox/Rec", "again", "()V");
        let main_code = [0xB8, (again >> 8) as u8, again as u8, 0xB1];
        b.method(
            MethodAccess::PUBLIC | MethodAccess::STATIC,
            "main",
            "([Ljava/lang/String;)V",
            1,
            1,
            &main_code,
        );
        let again_code = [0xB8, (again >> 8) as u8, again as u8, 0xB1];
        b.method(MethodAccess::PRIVATE | MethodAccess::STATIC, "again", "()V", 1, 0, &again_code);

        let (result, _) = run_main(b.build(), ExecutionLimits::default());
        assert!(matches!(result, Err(crate::Error::RecursionLimit(128))));
    }

    #[test]
    fn exit_is_recorded_and_execution_continues() {
        let mut b = ClassBuilder::new("sandbox/Exiter");
        let out = b.field_ref("sandbox/Capture", "out", "Ljava/io/PrintStream;");
        let println = b.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
        let exit = b.method_ref("sandbox/Capture", "exit", "(I)V");
        let after = b.string("after exit");

        let code = [
            0x08,                                    // iconst_5
            0xB8, (exit >> 8) as u8, exit as u8,     // invokestatic exit(I)V
            0xB2, (out >> 8) as u8, out as u8,
            0x12, after as u8,
            0xB6, (println >> 8) as u8, println as u8,
            0xB1,
        ];
        b.method(
            MethodAccess::PUBLIC | MethodAccess::STATIC,
            "main",
            "([Ljava/lang/String;)V",
            2,
            1,
            &code,
        );

        let (result, output) = run_main(b.build(), ExecutionLimits::default());
        assert!(matches!(result, Ok(None)));
        assert_eq!(output, "after exit\n");
    }

    #[test]
    fn thrown_exception_carries_its_message() {
        let (result, output) =
            run_main(patch(crate::test::hello_then_throw_class()), ExecutionLimits::default());
        assert_eq!(output, "hello\n");
        assert!(matches!(
            result,
            Err(crate::Error::Thrown { class, message })
                if class == "java/lang/IllegalStateException"
                    && message.as_deref() == Some("boom")
        ));
    }

    fn patch(bytes: Vec<u8>) -> Vec<u8> {
        use crate::rewrite::{redirect, RedirectionRequest};
        let mut class = crate::ClassFile::parse(bytes).unwrap();
        let request = RedirectionRequest::new("java/lang/System", "sandbox/Capture");
        redirect(&mut class, &request).unwrap();
        class.into_bytes()
    }

    #[test]
    fn descriptor_arg_counts() {
        assert_eq!(arg_count("()V").unwrap(), 0);
        assert_eq!(arg_count("(I)V").unwrap(), 1);
        assert_eq!(arg_count("(Ljava/lang/String;I)V").unwrap(), 2);
        assert_eq!(arg_count("([Ljava/lang/String;)V").unwrap(), 1);
        assert_eq!(arg_count("([[I[Ljava/lang/String;)I").unwrap(), 2);
        assert!(arg_count("no-parens").is_err());
    }
}
